use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use clientkit::fanout::bounded_map;
use clientkit::{ApiError, Identity, Session, SignOutReason};

use crate::config::ObrasConfig;
use crate::contract::client::ObrasApi;
use crate::contract::model::{
    Credentials, Expense, ExpenseInput, NewPart, NewSubgroup, NewUser, NewWork, PasswordChange,
    User, UserPatch,
};
use crate::domain::budget::{PartSpend, WorkBudget};
use crate::domain::error::{Action, DomainError};
use crate::domain::receipt::{self, download_name, kind_of};
use crate::domain::views::{
    DashboardView, ExpenseRow, PartDetailView, ReceiptView, UserDetailView, UserListView,
    WorkCard, WorkDetailView, WorkFormView,
};

/// Work form as filled in by the user; every field is required.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkForm {
    pub name: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub total_budget: Option<Decimal>,
    pub admin_id: Option<i64>,
}

impl WorkForm {
    fn validate(self) -> Result<NewWork, DomainError> {
        let name = self.name.filter(|n| !n.trim().is_empty());
        let mut missing = Vec::new();
        if name.is_none() {
            missing.push("name");
        }
        if self.start_date.is_none() {
            missing.push("startDate");
        }
        if self.end_date.is_none() {
            missing.push("endDate");
        }
        if self.total_budget.is_none() {
            missing.push("totalBudget");
        }
        if self.admin_id.is_none() {
            missing.push("adminId");
        }

        match (name, self.start_date, self.end_date, self.total_budget, self.admin_id) {
            (Some(name), Some(start_date), Some(end_date), Some(total_budget), Some(admin_id)) => {
                if end_date < start_date {
                    return Err(DomainError::EndBeforeStart);
                }
                Ok(NewWork {
                    name: name.trim().to_string(),
                    start_date,
                    end_date,
                    total_budget,
                    admin_id,
                })
            }
            _ => Err(DomainError::missing_fields(missing)),
        }
    }
}

/// Screen logic for the obras backoffice.
///
/// Each method corresponds to a screen load or a screen action: it checks the
/// local rules (role, required fields, ownership), performs the remote calls
/// through [`ObrasApi`] and returns a view-model or a [`DomainError`] whose
/// `Display` is the message to show.
pub struct Service {
    api: Arc<dyn ObrasApi>,
    session: Arc<Session>,
    config: ObrasConfig,
}

impl Service {
    pub fn new(api: Arc<dyn ObrasApi>, session: Arc<Session>, config: ObrasConfig) -> Self {
        Self {
            api,
            session,
            config,
        }
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn identity(&self) -> Result<Identity, DomainError> {
        self.session.identity().ok_or(DomainError::NotSignedIn)
    }

    fn require_admin(&self) -> Result<Identity, DomainError> {
        let identity = self.identity()?;
        if identity.is_admin() {
            Ok(identity)
        } else {
            Err(DomainError::AdminOnly)
        }
    }

    // --- session ---

    #[instrument(name = "obras.service.login", skip_all)]
    pub async fn login(&self, email: &str, password: &str) -> Result<Identity, DomainError> {
        let mut missing = Vec::new();
        if email.trim().is_empty() {
            missing.push("email");
        }
        if password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(DomainError::missing_fields(missing));
        }

        let credentials = Credentials {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        let pair = self
            .api
            .login(&credentials)
            .await
            .map_err(|e| DomainError::api(Action::Login, e))?;
        let identity = self
            .session
            .establish(pair)
            .map_err(|e| DomainError::api(Action::Login, ApiError::Session(e)))?;

        info!(user_id = identity.user_id, role = %identity.role, "signed in");
        Ok(identity)
    }

    pub fn logout(&self) -> Result<(), DomainError> {
        self.session
            .teardown(SignOutReason::Logout)
            .map_err(DomainError::Session)?;
        info!("signed out");
        Ok(())
    }

    // --- works ---

    #[instrument(name = "obras.service.dashboard", skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardView, DomainError> {
        let identity = self.identity()?;
        let works = self
            .api
            .list_works()
            .await
            .map_err(|e| DomainError::api(Action::ListWorks, e))?;

        let can_edit = identity.is_admin();
        Ok(DashboardView {
            cards: works
                .into_iter()
                .map(|work| WorkCard { work, can_edit })
                .collect(),
            can_create: identity.is_admin(),
        })
    }

    /// Load the create form (`work_id == None`) or the edit form.
    #[instrument(name = "obras.service.work_form", skip(self))]
    pub async fn work_form(&self, work_id: Option<i64>) -> Result<WorkFormView, DomainError> {
        self.require_admin()?;
        let work = match work_id {
            Some(id) => Some(
                self.api
                    .get_work(id)
                    .await
                    .map_err(|e| DomainError::api(Action::LoadWork, e))?,
            ),
            None => None,
        };
        let candidates = self
            .api
            .list_users()
            .await
            .map_err(|e| DomainError::api(Action::LoadWork, e))?;
        Ok(WorkFormView { work, candidates })
    }

    #[instrument(name = "obras.service.create_work", skip_all)]
    pub async fn create_work(&self, form: WorkForm) -> Result<(), DomainError> {
        self.require_admin()?;
        let work = form.validate()?;
        self.api
            .create_work(&work)
            .await
            .map_err(|e| DomainError::api(Action::CreateWork, e))?;
        info!(name = %work.name, "work created");
        Ok(())
    }

    #[instrument(name = "obras.service.update_work", skip(self, form))]
    pub async fn update_work(&self, id: i64, form: WorkForm) -> Result<(), DomainError> {
        self.require_admin()?;
        let work = form.validate()?;
        self.api
            .update_work(id, &work)
            .await
            .map_err(|e| DomainError::api(Action::UpdateWork, e))
    }

    /// Work header, subgroups, parts, then every part's expenses in parallel.
    ///
    /// A failed expense listing only marks its part incomplete. An expired
    /// session fails the whole screen.
    #[instrument(name = "obras.service.work_detail", skip(self))]
    pub async fn work_detail(&self, id: i64) -> Result<WorkDetailView, DomainError> {
        self.identity()?;
        let fail = |e| DomainError::api(Action::WorkDetail, e);

        let work = self.api.get_work(id).await.map_err(fail)?;
        let subgroups = self
            .api
            .list_subgroups(id, 1, self.config.page_limit)
            .await
            .map_err(fail)?;
        let parts = self
            .api
            .list_parts(id, 1, self.config.page_limit)
            .await
            .map_err(fail)?;
        debug!(
            subgroups = subgroups.len(),
            parts = parts.len(),
            "loading part expenses"
        );

        let api = self.api.as_ref();
        let results = bounded_map(parts, self.config.fanout_concurrency, |part| async move {
            let expenses = expenses_or_empty(api, part.id).await;
            (part, expenses)
        })
        .await;

        let mut spends = Vec::with_capacity(results.len());
        for (part, expenses) in results {
            match expenses {
                Ok(list) => spends.push(PartSpend::from_expenses(part, &list)),
                Err(e @ ApiError::SessionExpired(_)) => return Err(fail(e)),
                Err(e) => {
                    warn!(part_id = part.id, error = %e, "expense listing failed; part marked incomplete");
                    spends.push(PartSpend::unavailable(part));
                }
            }
        }

        Ok(WorkDetailView {
            work,
            budget: WorkBudget::group(subgroups, spends),
        })
    }

    /// Create a subgroup and return the refreshed work detail.
    #[instrument(name = "obras.service.create_subgroup", skip(self, subgroup))]
    pub async fn create_subgroup(
        &self,
        work_id: i64,
        subgroup: NewSubgroup,
    ) -> Result<WorkDetailView, DomainError> {
        self.identity()?;
        if subgroup.name.trim().is_empty() {
            return Err(DomainError::missing_fields(vec!["name"]));
        }
        self.api
            .create_subgroup(work_id, &subgroup)
            .await
            .map_err(|e| DomainError::api(Action::CreateSubgroup, e))?;
        self.work_detail(work_id).await
    }

    /// Create a part (subgroup optional) and return the refreshed work detail.
    #[instrument(name = "obras.service.create_part", skip(self, part))]
    pub async fn create_part(&self, work_id: i64, part: NewPart) -> Result<WorkDetailView, DomainError> {
        self.identity()?;
        if part.name.trim().is_empty() {
            return Err(DomainError::missing_fields(vec!["name"]));
        }
        self.api
            .create_part(work_id, &part)
            .await
            .map_err(|e| DomainError::api(Action::CreatePart, e))?;
        self.work_detail(work_id).await
    }

    // --- parts and expenses ---

    #[instrument(name = "obras.service.part_detail", skip(self))]
    pub async fn part_detail(&self, part_id: i64) -> Result<PartDetailView, DomainError> {
        let identity = self.identity()?;
        let fail = |e| DomainError::api(Action::PartDetail, e);

        let part = self.api.get_part(part_id).await.map_err(fail)?;
        let expenses = expenses_or_empty(self.api.as_ref(), part_id)
            .await
            .map_err(fail)?;

        let rows = expenses
            .into_iter()
            .map(|expense| ExpenseRow {
                can_modify: may_modify(&identity, &expense),
                expense,
            })
            .collect();
        Ok(PartDetailView { part, rows })
    }

    #[instrument(name = "obras.service.add_expense", skip(self, input))]
    pub async fn add_expense(
        &self,
        part_id: i64,
        input: ExpenseInput,
    ) -> Result<PartDetailView, DomainError> {
        self.identity()?;
        validate_expense(&input)?;
        self.api
            .create_expense(part_id, &input)
            .await
            .map_err(|e| DomainError::api(Action::SaveExpense, e))?;
        self.part_detail(part_id).await
    }

    #[instrument(name = "obras.service.edit_expense", skip(self, input))]
    pub async fn edit_expense(
        &self,
        part_id: i64,
        expense_id: i64,
        input: ExpenseInput,
    ) -> Result<PartDetailView, DomainError> {
        let identity = self.identity()?;
        validate_expense(&input)?;
        self.ensure_may_modify(&identity, part_id, expense_id, Action::SaveExpense)
            .await?;
        self.api
            .update_expense(expense_id, &input)
            .await
            .map_err(|e| DomainError::api(Action::SaveExpense, e))?;
        self.part_detail(part_id).await
    }

    #[instrument(name = "obras.service.delete_expense", skip(self))]
    pub async fn delete_expense(
        &self,
        part_id: i64,
        expense_id: i64,
    ) -> Result<PartDetailView, DomainError> {
        let identity = self.identity()?;
        self.ensure_may_modify(&identity, part_id, expense_id, Action::DeleteExpense)
            .await?;
        self.api
            .delete_expense(expense_id)
            .await
            .map_err(|e| DomainError::api(Action::DeleteExpense, e))?;
        info!(expense_id, "expense deleted");
        self.part_detail(part_id).await
    }

    /// Admins may modify anything; other users only expenses they recorded.
    async fn ensure_may_modify(
        &self,
        identity: &Identity,
        part_id: i64,
        expense_id: i64,
        action: Action,
    ) -> Result<(), DomainError> {
        if identity.is_admin() {
            return Ok(());
        }
        let expenses = expenses_or_empty(self.api.as_ref(), part_id)
            .await
            .map_err(|e| DomainError::api(action, e))?;
        match expenses.iter().find(|e| e.id == expense_id) {
            Some(expense) if may_modify(identity, expense) => Ok(()),
            _ => Err(DomainError::ExpenseNotOwned { expense_id }),
        }
    }

    #[instrument(name = "obras.service.receipt", skip(self))]
    pub async fn receipt(&self, expense_id: i64) -> Result<ReceiptView, DomainError> {
        self.identity()?;
        let link = match self.api.receipt_link(expense_id).await {
            Ok(link) if !link.signed_url.is_empty() => link,
            Ok(_) => return Err(DomainError::NoReceipt { expense_id }),
            Err(e) if e.is_not_found() => return Err(DomainError::NoReceipt { expense_id }),
            Err(e) => return Err(DomainError::api(Action::Receipt, e)),
        };

        let ext = link.file_extension.as_deref();
        Ok(ReceiptView {
            expense_id,
            kind: kind_of(ext),
            file_name: download_name(expense_id, ext),
            link,
        })
    }

    /// Resolve the signed link and fetch the file behind it.
    #[instrument(name = "obras.service.download_receipt", skip(self))]
    pub async fn download_receipt(
        &self,
        expense_id: i64,
    ) -> Result<(ReceiptView, Vec<u8>), DomainError> {
        let view = self.receipt(expense_id).await?;
        let bytes = self
            .api
            .download(&view.link.signed_url)
            .await
            .map_err(|e| DomainError::api(Action::Receipt, e))?;
        debug!(expense_id, size = bytes.len(), "receipt downloaded");
        Ok((view, bytes))
    }

    // --- users ---

    #[instrument(name = "obras.service.list_users", skip(self))]
    pub async fn list_users(&self) -> Result<UserListView, DomainError> {
        self.require_admin()?;
        let users = self
            .api
            .list_users()
            .await
            .map_err(|e| DomainError::api(Action::ListUsers, e))?;
        Ok(UserListView { users })
    }

    #[instrument(name = "obras.service.register_user", skip_all)]
    pub async fn register_user(&self, user: NewUser) -> Result<(), DomainError> {
        self.require_admin()?;
        let mut missing = Vec::new();
        if user.name.trim().is_empty() {
            missing.push("name");
        }
        if user.email.trim().is_empty() {
            missing.push("email");
        }
        if user.password.is_empty() {
            missing.push("password");
        }
        if !missing.is_empty() {
            return Err(DomainError::missing_fields(missing));
        }
        self.api
            .register_user(&user)
            .await
            .map_err(|e| DomainError::api(Action::RegisterUser, e))?;
        info!(email = %user.email, role = %user.role, "user registered");
        Ok(())
    }

    /// Admins may view anyone; other users only themselves.
    #[instrument(name = "obras.service.user_detail", skip(self))]
    pub async fn user_detail(&self, id: i64) -> Result<UserDetailView, DomainError> {
        let identity = self.identity()?;
        let is_self = identity.user_id == id;
        if !is_self && !identity.is_admin() {
            return Err(DomainError::CannotViewOtherUser);
        }
        let detail = self
            .api
            .get_user(id)
            .await
            .map_err(|e| DomainError::api(Action::UserDetail, e))?;
        Ok(UserDetailView {
            detail,
            is_self,
            can_manage: identity.is_admin(),
        })
    }

    pub async fn me(&self) -> Result<UserDetailView, DomainError> {
        let identity = self.identity()?;
        self.user_detail(identity.user_id).await
    }

    /// Admins edit anyone and may change roles. Other users edit only their
    /// own profile and never send a role.
    #[instrument(name = "obras.service.edit_user", skip(self, patch))]
    pub async fn edit_user(&self, id: i64, mut patch: UserPatch) -> Result<(), DomainError> {
        let identity = self.identity()?;
        if !identity.is_admin() {
            if identity.user_id != id {
                return Err(DomainError::CannotEditOtherUser);
            }
            if patch.role.take().is_some() {
                debug!("role change dropped for non-admin");
            }
        }

        let mut missing = Vec::new();
        if patch.name.trim().is_empty() {
            missing.push("name");
        }
        if patch.email.trim().is_empty() {
            missing.push("email");
        }
        if !missing.is_empty() {
            return Err(DomainError::missing_fields(missing));
        }

        self.api
            .update_user(id, &patch)
            .await
            .map_err(|e| DomainError::api(Action::UpdateUser, e))
    }

    /// `password` and `confirmation` must match before anything is sent.
    #[instrument(name = "obras.service.change_password", skip(self, current, password, confirmation))]
    pub async fn change_password(
        &self,
        id: i64,
        current: &str,
        password: &str,
        confirmation: &str,
    ) -> Result<(), DomainError> {
        let identity = self.identity()?;
        if !identity.is_admin() && identity.user_id != id {
            return Err(DomainError::CannotEditOtherUser);
        }
        if current.is_empty() || password.is_empty() {
            let mut missing = Vec::new();
            if current.is_empty() {
                missing.push("currentPassword");
            }
            if password.is_empty() {
                missing.push("password");
            }
            return Err(DomainError::missing_fields(missing));
        }
        if password != confirmation {
            return Err(DomainError::PasswordMismatch);
        }

        let change = PasswordChange {
            current_password: current.to_string(),
            password: password.to_string(),
        };
        self.api
            .change_password(id, &change)
            .await
            .map_err(|e| DomainError::api(Action::ChangePassword, e))
    }

    /// Admin accounts are never deleted from here; that check happens before
    /// any request.
    #[instrument(name = "obras.service.delete_user", skip(self, user), fields(user_id = user.id))]
    pub async fn delete_user(&self, user: &User) -> Result<(), DomainError> {
        self.require_admin()?;
        if user.role.is_admin() {
            return Err(DomainError::CannotDeleteAdmin);
        }
        self.api
            .delete_user(user.id)
            .await
            .map_err(|e| DomainError::api(Action::DeleteUser, e))?;
        info!(user_id = user.id, "user deleted");
        Ok(())
    }
}

/// Expense listing where a 404 means the part has no expenses yet.
async fn expenses_or_empty(api: &dyn ObrasApi, part_id: i64) -> Result<Vec<Expense>, ApiError> {
    match api.list_expenses(part_id).await {
        Err(e) if e.is_not_found() => Ok(Vec::new()),
        other => other,
    }
}

fn may_modify(identity: &Identity, expense: &Expense) -> bool {
    identity.is_admin() || expense.user_id == Some(identity.user_id)
}

fn validate_expense(input: &ExpenseInput) -> Result<(), DomainError> {
    let mut missing = Vec::new();
    if input.amount <= Decimal::ZERO {
        missing.push("amount");
    }
    if input.description.trim().is_empty() {
        missing.push("description");
    }
    if !missing.is_empty() {
        return Err(DomainError::missing_fields(missing));
    }
    receipt::validate_expense_date(input.date, Utc::now().date_naive())?;
    if let Some(file) = &input.receipt {
        receipt::validate_receipt(file)?;
    }
    Ok(())
}
