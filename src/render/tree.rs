use serde::Serialize;

use crate::content::MediaRef;

/// Display mode a tree was built for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Full,
    Teaser,
}

/// Image reference with an image style applied
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StyledImage {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alt: Option<String>,
}

impl StyledImage {
    /// Original image without a derivative style
    pub fn original(media: &MediaRef) -> Self {
        Self {
            url: media.url.clone(),
            style: None,
            alt: media.alt.clone(),
        }
    }

    /// Image derivative for `style`
    pub fn styled(media: &MediaRef, style: &str) -> Self {
        let separator = if media.url.contains('?') { '&' } else { '?' };
        Self {
            url: format!("{}{}style={}", media.url, separator, style),
            style: Some(style.to_string()),
            alt: media.alt.clone(),
        }
    }
}

/// One node of a rendered page
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RenderElement {
    /// Full-width header with the featured image behind the title
    Hero {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<StyledImage>,
    },
    Tags {
        tags: Vec<String>,
    },
    /// Body text styled as prose
    Prose {
        text: String,
    },
    WideContainer {
        children: Vec<RenderElement>,
    },
    Card {
        title: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<StyledImage>,
        date: String,
        url: String,
    },
}

/// Render output handed back to the HTTP layer
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderTree {
    pub view_mode: ViewMode,
    pub elements: Vec<RenderElement>,
}

impl RenderTree {
    pub fn new(view_mode: ViewMode) -> Self {
        Self {
            view_mode,
            elements: Vec::new(),
        }
    }

    pub fn push(&mut self, element: RenderElement) {
        self.elements.push(element);
    }
}

impl RenderElement {
    pub fn wide(child: RenderElement) -> Self {
        RenderElement::WideContainer {
            children: vec![child],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_styled_image_url() {
        let media = MediaRef {
            id: "m1".to_string(),
            url: "/files/a.jpg".to_string(),
            alt: None,
        };
        assert_eq!(StyledImage::styled(&media, "card").url, "/files/a.jpg?style=card");

        let media = MediaRef {
            url: "/files/a.jpg?v=2".to_string(),
            ..media
        };
        assert_eq!(StyledImage::styled(&media, "card").url, "/files/a.jpg?v=2&style=card");
    }

    #[test]
    fn test_element_serialization() {
        let element = RenderElement::wide(RenderElement::Prose {
            text: "Body".to_string(),
        });

        assert_eq!(
            serde_json::to_value(&element).unwrap(),
            json!({"type": "wide_container", "children": [{"type": "prose", "text": "Body"}]})
        );
    }
}
