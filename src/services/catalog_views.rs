// Catalog listings as clients render them
use chrono::NaiveDate;
use serde::Serialize;

use crate::database::catalog::{BusinessPostListingRow, PostListingRow};
use crate::database::models::{BusinessPost, Category, CustomerFrame, Post};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SubCategory {
    pub id: i64,
    pub name: String,
    pub banner_image: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CategoryNode {
    #[serde(flatten)]
    pub category: Category,
    pub sub_categories: Vec<SubCategory>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EventDetails {
    pub id: i64,
    pub name: String,
    pub date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostListing {
    #[serde(flatten)]
    pub post: Post,
    pub group_name: Option<String>,
    pub event_details: EventDetails,
    /// The viewer's frame images in this post's group
    pub customer_details: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BusinessPostListing {
    #[serde(flatten)]
    pub post: BusinessPost,
    pub group_name: Option<String>,
    pub business_category_name: Option<String>,
    pub thumbnail: Option<String>,
    pub customer_details: Vec<String>,
}

/// Every category with its direct children attached
pub fn nest_categories(
    categories: Vec<Category>,
    media_url: impl Fn(Option<&str>) -> Option<String>,
) -> Vec<CategoryNode> {
    let children: Vec<(Option<i64>, SubCategory)> = categories
        .iter()
        .map(|c| {
            (
                c.parent_id,
                SubCategory {
                    id: c.id,
                    name: c.name.clone(),
                    banner_image: media_url(c.banner_image.as_deref()),
                },
            )
        })
        .collect();

    categories
        .into_iter()
        .map(|category| {
            let sub_categories = children
                .iter()
                .filter(|(parent, _)| *parent == Some(category.id))
                .map(|(_, sub)| sub.clone())
                .collect();
            CategoryNode {
                category,
                sub_categories,
            }
        })
        .collect()
}

/// Frame image URLs of `frames` that sit in `group_id`
fn frames_in_group(
    frames: &[CustomerFrame],
    group_id: Option<i64>,
    media_url: &impl Fn(Option<&str>) -> Option<String>,
) -> Vec<String> {
    let Some(group_id) = group_id else {
        return Vec::new();
    };
    frames
        .iter()
        .filter(|f| f.group_id == Some(group_id))
        .filter_map(|f| media_url(f.frame_img.as_deref()))
        .collect()
}

pub fn post_listings(
    rows: Vec<PostListingRow>,
    viewer_frames: &[CustomerFrame],
    media_url: impl Fn(Option<&str>) -> Option<String>,
) -> Vec<PostListing> {
    rows.into_iter()
        .map(|row| PostListing {
            customer_details: frames_in_group(viewer_frames, row.post.group_id, &media_url),
            event_details: EventDetails {
                id: row.post.event_id,
                name: row.event_name,
                date: row.post.event_date,
                thumbnail: media_url(row.event_thumbnail.as_deref()),
            },
            group_name: row.group_name,
            post: row.post,
        })
        .collect()
}

pub fn business_post_listings(
    rows: Vec<BusinessPostListingRow>,
    viewer_frames: &[CustomerFrame],
    media_url: impl Fn(Option<&str>) -> Option<String>,
) -> Vec<BusinessPostListing> {
    rows.into_iter()
        .map(|row| BusinessPostListing {
            customer_details: frames_in_group(viewer_frames, row.post.group_id, &media_url),
            thumbnail: media_url(row.category_thumbnail.as_deref()),
            group_name: row.group_name,
            business_category_name: row.business_category_name,
            post: row.post,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn media(path: Option<&str>) -> Option<String> {
        path.map(|p| format!("http://media/{}", p))
    }

    fn category(id: i64, parent_id: Option<i64>) -> Category {
        Category {
            id,
            name: format!("c{}", id),
            parent_id,
            banner_image: Some(format!("banners/{}.png", id)),
            is_active: true,
            is_featured: false,
        }
    }

    fn frame(id: i64, group_id: Option<i64>, frame_img: Option<&str>) -> CustomerFrame {
        CustomerFrame {
            id,
            customer_id: 7,
            group_id,
            business_category_id: None,
            profession_type: None,
            display_name: None,
            frame_img: frame_img.map(str::to_string),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn post_row(id: i64, group: Option<(i64, &str)>, event_thumbnail: Option<&str>) -> PostListingRow {
        PostListingRow {
            post: Post {
                id,
                event_id: 3,
                group_id: group.map(|g| g.0),
                file_type: Some("image".to_string()),
                file: Some("posts/a.png".to_string()),
                added_on: Utc::now(),
                event_date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            },
            event_name: "Diwali".to_string(),
            event_thumbnail: event_thumbnail.map(str::to_string),
            group_name: group.map(|g| g.1.to_string()),
        }
    }

    #[test]
    fn categories_carry_their_direct_children() {
        let nodes = nest_categories(
            vec![category(1, None), category(2, Some(1)), category(3, Some(1)), category(4, Some(2))],
            media,
        );

        assert_eq!(nodes.len(), 4);
        let ids: Vec<i64> = nodes[0].sub_categories.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(nodes[0].sub_categories[0].banner_image.as_deref(), Some("http://media/banners/2.png"));
        assert_eq!(nodes[1].sub_categories.len(), 1);
        assert!(nodes[3].sub_categories.is_empty());

        let value = serde_json::to_value(&nodes[1]).unwrap();
        assert_eq!(value["parent_id"], 1);
        assert_eq!(value["sub_categories"][0]["name"], "c4");
    }

    #[test]
    fn post_listing_adds_group_event_and_viewer_frames() {
        let frames = vec![
            frame(1, Some(10), Some("frames/one.png")),
            frame(2, Some(11), Some("frames/two.png")),
            frame(3, Some(10), None),
        ];
        let listings = post_listings(
            vec![post_row(5, Some((10, "Alpha")), Some("events/diwali.png")), post_row(6, None, None)],
            &frames,
            media,
        );

        assert_eq!(listings[0].group_name.as_deref(), Some("Alpha"));
        assert_eq!(listings[0].customer_details, vec!["http://media/frames/one.png".to_string()]);
        assert_eq!(listings[1].group_name, None);
        assert!(listings[1].customer_details.is_empty());

        let value = serde_json::to_value(&listings[0]).unwrap();
        assert_eq!(value["id"], 5);
        assert_eq!(
            value["event_details"],
            json!({ "id": 3, "name": "Diwali", "date": "2024-11-01", "thumbnail": "http://media/events/diwali.png" })
        );
        let bare = serde_json::to_value(&listings[1]).unwrap();
        assert!(bare["event_details"].get("thumbnail").is_none());
    }

    #[test]
    fn business_listing_uses_category_thumbnail() {
        let row = BusinessPostListingRow {
            post: BusinessPost {
                id: 9,
                business_category_id: Some(4),
                group_id: Some(10),
                profession_type: Some("Doctor".to_string()),
                file_type: None,
                file: None,
                added_on: Utc::now(),
            },
            group_name: Some("Alpha".to_string()),
            business_category_name: Some("Dentist".to_string()),
            category_thumbnail: Some("thumbs/dentist.png".to_string()),
        };
        let listings = business_post_listings(vec![row], &[frame(1, Some(10), Some("frames/one.png"))], media);

        assert_eq!(listings[0].thumbnail.as_deref(), Some("http://media/thumbs/dentist.png"));
        assert_eq!(listings[0].business_category_name.as_deref(), Some("Dentist"));
        assert_eq!(listings[0].customer_details.len(), 1);
    }
}
