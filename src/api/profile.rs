use super::models::{LocalFile, ProfileUpdate, ProviderProfile, UploadResponse};
use super::{single_file_form, ApiClient, ApiResult};

impl ApiClient {
    pub async fn fetch_profile(&self) -> ApiResult<ProviderProfile> {
        self.get("/providers/profile", &[]).await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> ApiResult<()> {
        self.put_ack("/providers/profile", update, None).await?;
        Ok(())
    }

    pub async fn upload_portfolio_image(&self, file: &LocalFile) -> ApiResult<UploadResponse> {
        let form = single_file_form("image", file).await?;
        self.post_multipart("/providers/portfolio", form, None).await
    }
}
