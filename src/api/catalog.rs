use super::models::{Category, NameList, Subcategory, SubscriptionPlan};
use super::{path_segment, ApiClient, ApiResult};

impl ApiClient {
    pub async fn categories(&self) -> ApiResult<Vec<Category>> {
        self.get("/categories", &[]).await
    }

    pub async fn subcategories(&self, category_id: &str) -> ApiResult<Vec<Subcategory>> {
        let path = format!("/categories/{}/subcategories", path_segment(category_id));
        self.get(&path, &[]).await
    }

    /// Popular subcategory names for a category (by name).
    pub async fn popular_subcategories(&self, category: &str) -> ApiResult<Vec<String>> {
        let names: NameList = self
            .get("/categories/popular-subcategories", &[("category", category)])
            .await?;
        Ok(names.0)
    }

    pub async fn subscription_plans(&self) -> ApiResult<Vec<SubscriptionPlan>> {
        self.get("/subscriptions/plans", &[]).await
    }
}
