use async_trait::async_trait;
use clientkit::{ApiClient, ApiError, ApiRequest, FilePart, MultipartForm, TokenPair};
use serde::de::DeserializeOwned;
use tracing::instrument;

use crate::contract::client::ObrasApi;
use crate::contract::model::{
    Credentials, Expense, ExpenseInput, NewPart, NewSubgroup, NewUser, NewWork, Part,
    PasswordChange, ReceiptLink, Subgroup, User, UserDetail, UserPatch, Work,
};
use crate::domain::receipt::mime_for;
use crate::infra::http::dto::{
    Envelope, ExpenseDto, LoginRequest, PartDto, PartRequest, PasswordRequest, ReceiptLinkDto,
    RegisterRequest, SubgroupDto, SubgroupRequest, TokenPairDto, UserDetailDto, UserDto,
    UserPatchRequest, WorkDto, WorkRequest,
};
use crate::infra::http::mapper::{expense_from_dto, part_from_dto, subgroup_from_dto};

/// HTTP gateway for the obras API, built on the intercepting [`ApiClient`].
#[derive(Clone)]
pub struct HttpObrasClient {
    api: ApiClient,
}

impl HttpObrasClient {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    async fn fetch<T: DeserializeOwned>(&self, req: ApiRequest) -> Result<T, ApiError> {
        Ok(self.api.json::<Envelope<T>>(req).await?.into_inner())
    }
}

fn work_body(work: &NewWork) -> WorkRequest<'_> {
    WorkRequest {
        name: &work.name,
        start_date: work.start_date,
        end_date: work.end_date,
        total_budget: work.total_budget,
        admin_id: work.admin_id,
    }
}

fn expense_form(expense: &ExpenseInput) -> MultipartForm {
    let form = MultipartForm::new()
        .text("amount", expense.amount.normalize().to_string())
        .text("description", expense.description.clone())
        .text("date", expense.date.format("%Y-%m-%d").to_string());

    match &expense.receipt {
        Some(file) => form.file(
            "receipt",
            FilePart::new(
                file.file_name.clone(),
                mime_for(&file.file_name).unwrap_or("application/octet-stream"),
                file.bytes.clone(),
            ),
        ),
        None => form,
    }
}

#[async_trait]
impl ObrasApi for HttpObrasClient {
    #[instrument(name = "obras.http.login", skip_all)]
    async fn login(&self, credentials: &Credentials) -> Result<TokenPair, ApiError> {
        let req = ApiRequest::post("/users/login")
            .json(&LoginRequest {
                email: &credentials.email,
                password: &credentials.password,
            })?
            .without_auth();
        let pair: TokenPairDto = self.api.json(req).await?;
        Ok(pair.into())
    }

    #[instrument(name = "obras.http.list_works", skip_all)]
    async fn list_works(&self) -> Result<Vec<Work>, ApiError> {
        let works: Vec<WorkDto> = self.fetch(ApiRequest::get("/works")).await?;
        Ok(works.into_iter().map(Into::into).collect())
    }

    #[instrument(name = "obras.http.get_work", skip_all, fields(work_id = id))]
    async fn get_work(&self, id: i64) -> Result<Work, ApiError> {
        let work: WorkDto = self.fetch(ApiRequest::get(format!("/works/{}", id))).await?;
        Ok(work.into())
    }

    #[instrument(name = "obras.http.create_work", skip_all)]
    async fn create_work(&self, work: &NewWork) -> Result<(), ApiError> {
        self.api
            .execute_unit(ApiRequest::post("/works").json(&work_body(work))?)
            .await
    }

    #[instrument(name = "obras.http.update_work", skip_all, fields(work_id = id))]
    async fn update_work(&self, id: i64, work: &NewWork) -> Result<(), ApiError> {
        self.api
            .execute_unit(ApiRequest::put(format!("/works/{}", id)).json(&work_body(work))?)
            .await
    }

    #[instrument(name = "obras.http.list_subgroups", skip_all, fields(work_id = work_id))]
    async fn list_subgroups(
        &self,
        work_id: i64,
        page: u32,
        limit: u32,
    ) -> Result<Vec<Subgroup>, ApiError> {
        let req = ApiRequest::get(format!("/subgroups/{}/subgroups", work_id))
            .query("page", page)
            .query("limit", limit);
        let items: Vec<SubgroupDto> = self.fetch(req).await?;
        Ok(items
            .into_iter()
            .map(|d| subgroup_from_dto(d, work_id))
            .collect())
    }

    #[instrument(name = "obras.http.create_subgroup", skip_all, fields(work_id = work_id))]
    async fn create_subgroup(&self, work_id: i64, subgroup: &NewSubgroup) -> Result<(), ApiError> {
        let req = ApiRequest::post(format!("/subgroups/{}/subgroups", work_id)).json(
            &SubgroupRequest {
                name: &subgroup.name,
                budget: subgroup.budget,
                work_id,
            },
        )?;
        self.api.execute_unit(req).await
    }

    #[instrument(name = "obras.http.list_parts", skip_all, fields(work_id = work_id))]
    async fn list_parts(&self, work_id: i64, page: u32, limit: u32) -> Result<Vec<Part>, ApiError> {
        let req = ApiRequest::get(format!("/parts/{}/parts", work_id))
            .query("page", page)
            .query("limit", limit);
        let items: Vec<PartDto> = self.fetch(req).await?;
        Ok(items
            .into_iter()
            .map(|d| part_from_dto(d, Some(work_id)))
            .collect())
    }

    #[instrument(name = "obras.http.get_part", skip_all, fields(part_id = id))]
    async fn get_part(&self, id: i64) -> Result<Part, ApiError> {
        let part: PartDto = self.fetch(ApiRequest::get(format!("/parts/{}", id))).await?;
        Ok(part_from_dto(part, None))
    }

    #[instrument(name = "obras.http.create_part", skip_all, fields(work_id = work_id))]
    async fn create_part(&self, work_id: i64, part: &NewPart) -> Result<(), ApiError> {
        let req = ApiRequest::post(format!("/parts/{}/parts", work_id)).json(&PartRequest {
            name: &part.name,
            budget: part.budget,
            subgroup_id: part.subgroup_id,
            work_id,
        })?;
        self.api.execute_unit(req).await
    }

    #[instrument(name = "obras.http.list_expenses", skip_all, fields(part_id = part_id))]
    async fn list_expenses(&self, part_id: i64) -> Result<Vec<Expense>, ApiError> {
        let req = ApiRequest::get(format!("/expenses/parts/{}/expenses", part_id));
        let items: Vec<ExpenseDto> = self.fetch(req).await?;
        Ok(items
            .into_iter()
            .map(|d| expense_from_dto(d, part_id))
            .collect())
    }

    #[instrument(name = "obras.http.create_expense", skip_all, fields(part_id = part_id))]
    async fn create_expense(&self, part_id: i64, expense: &ExpenseInput) -> Result<(), ApiError> {
        let req = ApiRequest::post(format!("/expenses/parts/{}/expenses", part_id))
            .multipart(expense_form(expense));
        self.api.execute_unit(req).await
    }

    #[instrument(name = "obras.http.update_expense", skip_all, fields(expense_id = id))]
    async fn update_expense(&self, id: i64, expense: &ExpenseInput) -> Result<(), ApiError> {
        let req = ApiRequest::put(format!("/expenses/{}", id)).multipart(expense_form(expense));
        self.api.execute_unit(req).await
    }

    #[instrument(name = "obras.http.delete_expense", skip_all, fields(expense_id = id))]
    async fn delete_expense(&self, id: i64) -> Result<(), ApiError> {
        self.api
            .execute_unit(ApiRequest::delete(format!("/expenses/{}", id)))
            .await
    }

    #[instrument(name = "obras.http.receipt_link", skip_all, fields(expense_id = expense_id))]
    async fn receipt_link(&self, expense_id: i64) -> Result<ReceiptLink, ApiError> {
        let link: ReceiptLinkDto = self
            .fetch(ApiRequest::get(format!("/expenses/{}/receipt", expense_id)))
            .await?;
        Ok(link.into())
    }

    #[instrument(name = "obras.http.download", skip_all)]
    async fn download(&self, url: &str) -> Result<Vec<u8>, ApiError> {
        self.api.download(url).await
    }

    #[instrument(name = "obras.http.list_users", skip_all)]
    async fn list_users(&self) -> Result<Vec<User>, ApiError> {
        let users: Vec<UserDto> = self.fetch(ApiRequest::get("/users")).await?;
        Ok(users.into_iter().map(Into::into).collect())
    }

    #[instrument(name = "obras.http.get_user", skip_all, fields(user_id = id))]
    async fn get_user(&self, id: i64) -> Result<UserDetail, ApiError> {
        let user: UserDetailDto = self.fetch(ApiRequest::get(format!("/users/{}", id))).await?;
        Ok(user.into())
    }

    #[instrument(name = "obras.http.register_user", skip_all)]
    async fn register_user(&self, user: &NewUser) -> Result<(), ApiError> {
        let req = ApiRequest::post("/users/register").json(&RegisterRequest {
            name: &user.name,
            email: &user.email,
            password: &user.password,
            role: user.role,
        })?;
        self.api.execute_unit(req).await
    }

    #[instrument(name = "obras.http.update_user", skip_all, fields(user_id = id))]
    async fn update_user(&self, id: i64, patch: &UserPatch) -> Result<(), ApiError> {
        let req = ApiRequest::put(format!("/users/{}", id)).json(&UserPatchRequest {
            name: &patch.name,
            email: &patch.email,
            role: patch.role,
        })?;
        self.api.execute_unit(req).await
    }

    #[instrument(name = "obras.http.change_password", skip_all, fields(user_id = id))]
    async fn change_password(&self, id: i64, change: &PasswordChange) -> Result<(), ApiError> {
        let req = ApiRequest::put(format!("/users/{}", id)).json(&PasswordRequest {
            current_password: &change.current_password,
            password: &change.password,
        })?;
        self.api.execute_unit(req).await
    }

    #[instrument(name = "obras.http.delete_user", skip_all, fields(user_id = id))]
    async fn delete_user(&self, id: i64) -> Result<(), ApiError> {
        self.api
            .execute_unit(ApiRequest::delete(format!("/users/{}", id)))
            .await
    }
}
