use crate::dtos::not_blank;
use crate::models::{Category, CategoryWithCount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RenameCategoryRequest {
    #[validate(
        length(min = 1, max = 100, message = "Name must be 1-100 characters"),
        custom(function = "not_blank", message = "Name is required")
    )]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct CategoryResponse {
    pub category_id: Uuid,
    pub name: String,
    pub is_user_created: bool,
    pub transaction_count: i64,
    pub created_at: DateTime<Utc>,
}

impl From<CategoryWithCount> for CategoryResponse {
    fn from(category: CategoryWithCount) -> Self {
        Self {
            category_id: category.category_id,
            name: category.name,
            is_user_created: category.is_user_created,
            transaction_count: category.transaction_count,
            created_at: category.created_utc,
        }
    }
}

impl CategoryResponse {
    pub fn with_count(category: Category, transaction_count: i64) -> Self {
        Self {
            category_id: category.category_id,
            name: category.name,
            is_user_created: category.is_user_created,
            transaction_count,
            created_at: category.created_utc,
        }
    }
}
