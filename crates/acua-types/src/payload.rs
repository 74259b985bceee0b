use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Maximum length, in characters, of previews and notification snippets.
pub const SNIPPET_LEN: usize = 100;

/// Body of a chat message. Cards are explicit variants rather than text with
/// a magic prefix.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessagePayload {
    Text {
        text: String,
    },
    Image {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    ProductCard {
        product_id: Uuid,
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        price: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        image_url: Option<String>,
    },
    ProfessionalCard {
        professional_id: Uuid,
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        specialty: Option<String>,
    },
}

impl MessagePayload {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    /// Returns a description of the first problem found, if any.
    pub fn validate(&self) -> Result<(), &'static str> {
        match self {
            Self::Text { text } if text.trim().is_empty() => Err("message text is empty"),
            Self::Image { url, .. } if url.trim().is_empty() => Err("image url is empty"),
            Self::ProductCard { title, .. } if title.trim().is_empty() => {
                Err("product card has no title")
            }
            Self::ProfessionalCard { name, .. } if name.trim().is_empty() => {
                Err("professional card has no name")
            }
            _ => Ok(()),
        }
    }

    /// One-line preview shown in conversation lists and notifications.
    pub fn summary(&self) -> String {
        match self {
            Self::Text { text } => snippet(text, SNIPPET_LEN),
            Self::Image { caption: Some(c), .. } if !c.trim().is_empty() => {
                format!("📷 {}", snippet(c, SNIPPET_LEN))
            }
            Self::Image { .. } => "📷 Imagen".to_string(),
            Self::ProductCard { title, .. } => format!("🛒 {}", snippet(title, SNIPPET_LEN)),
            Self::ProfessionalCard { name, .. } => format!("👤 {}", snippet(name, SNIPPET_LEN)),
        }
    }
}

/// Truncates `text` to at most `max` characters, appending `…` when cut.
pub fn snippet(text: &str, max: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_on_the_wire() {
        let card = MessagePayload::ProductCard {
            product_id: Uuid::nil(),
            title: "Alevinos de tilapia".into(),
            price: Some(350.0),
            image_url: None,
        };
        let json = serde_json::to_value(&card).unwrap();
        assert_eq!(json["kind"], "product_card");
        assert_eq!(json["title"], "Alevinos de tilapia");
        assert!(json.get("image_url").is_none());

        let text: MessagePayload =
            serde_json::from_str(r#"{"kind":"text","text":"Hola"}"#).unwrap();
        assert_eq!(text, MessagePayload::text("Hola"));
    }

    #[test]
    fn card_prefix_is_just_text() {
        let payload: MessagePayload =
            serde_json::from_str(r#"{"kind":"text","text":"::product-card::abc"}"#).unwrap();
        assert!(matches!(payload, MessagePayload::Text { .. }));
    }

    #[test]
    fn empty_text_is_invalid() {
        assert!(MessagePayload::text("   ").validate().is_err());
        assert!(MessagePayload::text("hola").validate().is_ok());
    }

    #[test]
    fn summaries() {
        let image = MessagePayload::Image { url: "https://x/y.png".into(), caption: None };
        assert_eq!(image.summary(), "📷 Imagen");
        let pro = MessagePayload::ProfessionalCard {
            professional_id: Uuid::nil(),
            name: "Dra. Ruiz".into(),
            specialty: None,
        };
        assert_eq!(pro.summary(), "👤 Dra. Ruiz");
    }

    #[test]
    fn snippet_respects_char_boundaries() {
        assert_eq!(snippet("camarón", 10), "camarón");
        assert_eq!(snippet("camarón", 6), "camaró…");
        assert_eq!(snippet("  hola  ", 10), "hola");
    }
}
