use serde_json::{json, Value};
use std::sync::Arc;

use crate::config;
use crate::database::models::{frame::is_a_group_name, ContentMapping, MappingKind};
use crate::database::store::{MappingStore, MappingView};
use crate::error::ApiError;
use crate::services::media::media_url_with_base;

/// How `is_a_group` is answered in mapping listings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IsAGroupMode {
    /// Always answer true, as older clients expect
    pub legacy: bool,
}

/// The value clients see for `is_a_group`: a "True"/"False" string for post
/// and business mappings, a boolean for other-post mappings
fn is_a_group_value(kind: MappingKind, answer: bool) -> Value {
    match kind {
        MappingKind::OtherPost => Value::Bool(answer),
        MappingKind::Post | MappingKind::BusinessPost => {
            Value::String(if answer { "True" } else { "False" }.to_string())
        }
    }
}

pub fn render_mapping(
    kind: MappingKind,
    view: &MappingView,
    customer_number: Option<&str>,
    mode: IsAGroupMode,
    media_base: &str,
) -> Value {
    let by_name = view.frame_group_name.as_deref().map(is_a_group_name).unwrap_or(false);
    let answer = if mode.legacy {
        if !by_name {
            tracing::warn!(
                mapping_id = view.id,
                group = ?view.frame_group_name,
                "is_a_group reported true for a frame outside the A group"
            );
        }
        true
    } else {
        by_name
    };

    let content_key = match kind {
        MappingKind::Post | MappingKind::BusinessPost => "post",
        MappingKind::OtherPost => "other_post",
    };

    let mut body = json!({
        "id": view.id,
        "customer": view.customer_id,
        "customer_frame": view.customer_frame_id,
        "is_downloaded": view.is_downloaded,
        "post_image": media_url_with_base(media_base, view.content_file.as_deref()),
        "frame_image": media_url_with_base(media_base, view.frame_img.as_deref()),
        "is_a_group": is_a_group_value(kind, answer),
    });

    body[content_key] = json!(view.content_id);
    if kind != MappingKind::OtherPost {
        body["customer_number"] = json!(customer_number);
    }
    if kind == MappingKind::Post {
        body["event_name"] = json!(view.event_name);
    }
    body
}

/// Read side of the mapping tables for the current customer
#[derive(Clone)]
pub struct MappingViewService {
    store: Arc<dyn MappingStore>,
}

impl MappingViewService {
    pub fn new(store: Arc<dyn MappingStore>) -> Self {
        Self { store }
    }

    pub async fn list(&self, kind: MappingKind, customer_id: i64) -> Result<Vec<Value>, ApiError> {
        let customer_number = self.store.find_user(customer_id).await?.map(|u| u.whatsapp_number);
        let mode = IsAGroupMode {
            legacy: config::config().mapping.legacy_is_a_group,
        };
        let base = &config::config().media.base_url;

        Ok(self
            .store
            .mapping_views(kind, customer_id)
            .await?
            .iter()
            .map(|view| render_mapping(kind, view, customer_number.as_deref(), mode, base))
            .collect())
    }

    /// Flag a mapping as downloaded; only its customer may do so
    pub async fn mark_downloaded(&self, kind: MappingKind, id: i64, customer_id: i64) -> Result<ContentMapping, ApiError> {
        let mut mapping = self
            .store
            .find_mapping(kind, id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("{} mapping {} not found", kind, id)))?;
        if mapping.customer_id != customer_id {
            return Err(ApiError::forbidden("Mapping belongs to another customer"));
        }
        if mapping.is_downloaded {
            return Ok(mapping);
        }

        mapping.is_downloaded = true;
        Ok(self.store.save_mapping(kind, &mapping).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn view(group: Option<&str>) -> MappingView {
        MappingView {
            id: 1,
            customer_id: 2,
            content_id: 3,
            customer_frame_id: 4,
            is_downloaded: false,
            content_file: Some("posts/3.png".to_string()),
            frame_img: Some("customer_frame/4.webp".to_string()),
            frame_group_name: group.map(str::to_string),
            event_name: Some("Diwali".to_string()),
        }
    }

    const BASE: &str = "http://media.example.com/media";

    #[test]
    fn legacy_mode_always_answers_true_with_per_table_types() {
        let mode = IsAGroupMode { legacy: true };
        let post = render_mapping(MappingKind::Post, &view(Some("Beta")), Some("900"), mode, BASE);
        assert_eq!(post["is_a_group"], "True");
        assert_eq!(post["customer_number"], "900");
        assert_eq!(post["event_name"], "Diwali");
        assert_eq!(post["post"], 3);

        let other = render_mapping(MappingKind::OtherPost, &view(Some("Beta")), Some("900"), mode, BASE);
        assert_eq!(other["is_a_group"], true);
        assert_eq!(other["other_post"], 3);
        assert!(other.get("customer_number").is_none());
        assert!(other.get("event_name").is_none());
    }

    #[test]
    fn name_based_mode_checks_group_prefix() {
        let mode = IsAGroupMode { legacy: false };
        let beta = render_mapping(MappingKind::BusinessPost, &view(Some("Beta")), None, mode, BASE);
        assert_eq!(beta["is_a_group"], "False");
        let alpha = render_mapping(MappingKind::OtherPost, &view(Some("Alpha")), None, mode, BASE);
        assert_eq!(alpha["is_a_group"], true);
        let none = render_mapping(MappingKind::OtherPost, &view(None), None, mode, BASE);
        assert_eq!(none["is_a_group"], false);
    }

    #[test]
    fn images_are_absolute() {
        let body = render_mapping(MappingKind::Post, &view(None), None, IsAGroupMode { legacy: true }, BASE);
        assert_eq!(body["post_image"], "http://media.example.com/media/posts/3.png");
        assert_eq!(body["frame_image"], "http://media.example.com/media/customer_frame/4.webp");
    }
}
