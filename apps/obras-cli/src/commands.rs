use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Args, Subcommand};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};

use clientkit::AuthState;
use obras::model::{ExpenseInput, NewPart, NewSubgroup, NewUser, ReceiptFile, Role, UserPatch};
use obras::{Service, WorkForm};

use crate::render;

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in, sign out and inspect the stored session
    #[command(subcommand)]
    Session(SessionCmd),
    /// Construction projects
    #[command(subcommand)]
    Works(WorksCmd),
    /// Budget subgroups of a work
    #[command(subcommand)]
    Subgroups(SubgroupsCmd),
    /// Budget lines of a work
    #[command(subcommand)]
    Parts(PartsCmd),
    /// Expenses recorded against a part
    #[command(subcommand)]
    Expenses(ExpensesCmd),
    /// User accounts
    #[command(subcommand)]
    Users(UsersCmd),
}

#[derive(Subcommand)]
pub enum SessionCmd {
    /// Exchange credentials for a session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "OBRAS_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Forget the stored session
    Logout,
    /// Show who the stored session belongs to
    Whoami,
    /// Validate the configuration and exit
    Check,
}

#[derive(Subcommand)]
pub enum WorksCmd {
    /// Dashboard: one line per work
    List,
    /// Budget breakdown of a work
    Show { id: i64 },
    /// Users that can be put in charge of a work
    Candidates,
    /// Create a work (admin)
    Create(WorkArgs),
    /// Update a work (admin); omitted fields keep their current value
    Edit {
        id: i64,
        #[command(flatten)]
        fields: WorkArgs,
    },
}

#[derive(Args)]
pub struct WorkArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long, value_parser = parse_date)]
    start: Option<NaiveDate>,
    #[arg(long, value_parser = parse_date)]
    end: Option<NaiveDate>,
    #[arg(long)]
    budget: Option<Decimal>,
    /// User in charge
    #[arg(long)]
    admin_id: Option<i64>,
}

impl WorkArgs {
    fn into_form(self) -> WorkForm {
        WorkForm {
            name: self.name,
            start_date: self.start,
            end_date: self.end,
            total_budget: self.budget,
            admin_id: self.admin_id,
        }
    }
}

#[derive(Subcommand)]
pub enum SubgroupsCmd {
    Create {
        work_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        budget: Decimal,
    },
}

#[derive(Subcommand)]
pub enum PartsCmd {
    /// Create a part; without --subgroup it lands in "Sin Categoría"
    Create {
        work_id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        budget: Decimal,
        #[arg(long)]
        subgroup: Option<i64>,
    },
    /// Expenses of a part
    Show { id: i64 },
}

#[derive(Args)]
pub struct ExpenseArgs {
    #[arg(long)]
    amount: Decimal,
    #[arg(long)]
    description: String,
    #[arg(long, value_parser = parse_date)]
    date: NaiveDate,
    /// Receipt to attach (.jpg, .jpeg, .png or .pdf)
    #[arg(long)]
    receipt: Option<PathBuf>,
}

impl ExpenseArgs {
    fn into_input(self) -> Result<ExpenseInput> {
        let receipt = match self.receipt {
            Some(path) => Some(read_receipt(&path)?),
            None => None,
        };
        Ok(ExpenseInput {
            amount: self.amount,
            description: self.description,
            date: self.date,
            receipt,
        })
    }
}

#[derive(Subcommand)]
pub enum ExpensesCmd {
    Add {
        part_id: i64,
        #[command(flatten)]
        fields: ExpenseArgs,
    },
    Edit {
        part_id: i64,
        expense_id: i64,
        #[command(flatten)]
        fields: ExpenseArgs,
    },
    Delete { part_id: i64, expense_id: i64 },
    /// Show the receipt link, or save the file with --output
    Receipt {
        expense_id: i64,
        /// File or directory to write the receipt to
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum UsersCmd {
    /// All accounts (admin)
    List,
    Show { id: i64 },
    /// The signed-in account
    Me,
    /// Create an account (admin)
    Register {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long, env = "OBRAS_NEW_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long, default_value = "user")]
        role: Role,
    },
    /// Update name and email; --role is honored for admins only
    Edit {
        id: i64,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        role: Option<Role>,
    },
    /// Delete an account (admin); admin accounts cannot be deleted
    Delete { id: i64 },
    /// Change a password
    Passwd {
        id: i64,
        #[arg(long, env = "OBRAS_PASSWORD", hide_env_values = true)]
        current: String,
        #[arg(long)]
        new: String,
        #[arg(long)]
        confirm: String,
    },
}

/// Accepts `YYYY-MM-DD` or `DD/MM/YYYY`.
fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%d/%m/%Y"))
        .map_err(|_| format!("invalid date '{}', expected YYYY-MM-DD", raw))
}

fn read_receipt(path: &Path) -> Result<ReceiptFile> {
    let bytes = std::fs::read(path)
        .with_context(|| format!("Failed to read receipt '{}'", path.display()))?;
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    Ok(ReceiptFile { file_name, bytes })
}

pub async fn execute(cmd: Commands, service: &Service) -> Result<()> {
    match cmd {
        Commands::Session(cmd) => session(cmd, service).await,
        Commands::Works(cmd) => works(cmd, service).await,
        Commands::Subgroups(SubgroupsCmd::Create {
            work_id,
            name,
            budget,
        }) => {
            let view = service
                .create_subgroup(work_id, NewSubgroup { name, budget })
                .await?;
            print!("{}", render::work_detail(&view));
            Ok(())
        }
        Commands::Parts(cmd) => parts(cmd, service).await,
        Commands::Expenses(cmd) => expenses(cmd, service).await,
        Commands::Users(cmd) => users(cmd, service).await,
    }
}

async fn session(cmd: SessionCmd, service: &Service) -> Result<()> {
    match cmd {
        SessionCmd::Login { email, password } => {
            let identity = service.login(&email, &password).await?;
            println!("Sesión iniciada (usuario #{}, rol {})", identity.user_id, identity.role);
        }
        SessionCmd::Logout => {
            service.logout()?;
            println!("Sesión cerrada");
        }
        SessionCmd::Whoami => match service.session().auth_state() {
            AuthState::SignedIn(id) => println!("usuario #{} ({})", id.user_id, id.role),
            AuthState::SignedOut(reason) => println!("sin sesión: {}", reason),
        },
        // handled before the session is built
        SessionCmd::Check => {}
    }
    Ok(())
}

async fn works(cmd: WorksCmd, service: &Service) -> Result<()> {
    match cmd {
        WorksCmd::List => print!("{}", render::dashboard(&service.dashboard().await?)),
        WorksCmd::Show { id } => print!("{}", render::work_detail(&service.work_detail(id).await?)),
        WorksCmd::Candidates => {
            let form = service.work_form(None).await?;
            print!("{}", render::users_for_form(&form.candidates));
        }
        WorksCmd::Create(fields) => {
            service.create_work(fields.into_form()).await?;
            println!("Obra creada");
        }
        WorksCmd::Edit { id, fields } => {
            let current = service.work_form(Some(id)).await?.work;
            let mut form = fields.into_form();
            if let Some(w) = current {
                form.name = form.name.or(Some(w.name));
                form.start_date = form.start_date.or(w.start_date);
                form.end_date = form.end_date.or(w.end_date);
                form.total_budget = form.total_budget.or(Some(w.total_budget));
                form.admin_id = form.admin_id.or(w.admin_id);
            }
            service.update_work(id, form).await?;
            println!("Obra actualizada");
        }
    }
    Ok(())
}

async fn parts(cmd: PartsCmd, service: &Service) -> Result<()> {
    match cmd {
        PartsCmd::Create {
            work_id,
            name,
            budget,
            subgroup,
        } => {
            let view = service
                .create_part(
                    work_id,
                    NewPart {
                        name,
                        budget,
                        subgroup_id: subgroup,
                    },
                )
                .await?;
            print!("{}", render::work_detail(&view));
        }
        PartsCmd::Show { id } => print!("{}", render::part_detail(&service.part_detail(id).await?)),
    }
    Ok(())
}

async fn expenses(cmd: ExpensesCmd, service: &Service) -> Result<()> {
    match cmd {
        ExpensesCmd::Add { part_id, fields } => {
            let view = service.add_expense(part_id, fields.into_input()?).await?;
            print!("{}", render::part_detail(&view));
        }
        ExpensesCmd::Edit {
            part_id,
            expense_id,
            fields,
        } => {
            let view = service
                .edit_expense(part_id, expense_id, fields.into_input()?)
                .await?;
            print!("{}", render::part_detail(&view));
        }
        ExpensesCmd::Delete {
            part_id,
            expense_id,
        } => {
            let view = service.delete_expense(part_id, expense_id).await?;
            print!("{}", render::part_detail(&view));
        }
        ExpensesCmd::Receipt { expense_id, output } => match output {
            None => print!("{}", render::receipt(&service.receipt(expense_id).await?)),
            Some(target) => {
                let (view, bytes) = service.download_receipt(expense_id).await?;
                let path = if target.is_dir() {
                    target.join(&view.file_name)
                } else {
                    target
                };
                std::fs::write(&path, &bytes)
                    .with_context(|| format!("Failed to write receipt to '{}'", path.display()))?;
                println!("Recibo guardado en {}", path.display());
            }
        },
    }
    Ok(())
}

async fn users(cmd: UsersCmd, service: &Service) -> Result<()> {
    match cmd {
        UsersCmd::List => print!("{}", render::user_list(&service.list_users().await?)),
        UsersCmd::Show { id } => print!("{}", render::user_detail(&service.user_detail(id).await?)),
        UsersCmd::Me => print!("{}", render::user_detail(&service.me().await?)),
        UsersCmd::Register {
            name,
            email,
            password,
            role,
        } => {
            service
                .register_user(NewUser {
                    name,
                    email,
                    password,
                    role,
                })
                .await?;
            println!("Usuario registrado");
        }
        UsersCmd::Edit {
            id,
            name,
            email,
            role,
        } => {
            service.edit_user(id, UserPatch { name, email, role }).await?;
            println!("Usuario actualizado");
        }
        UsersCmd::Delete { id } => {
            let target = service.user_detail(id).await?.detail.user;
            service.delete_user(&target).await?;
            println!("Usuario eliminado");
        }
        UsersCmd::Passwd {
            id,
            current,
            new,
            confirm,
        } => {
            service.change_password(id, &current, &new, &confirm).await?;
            println!("Contraseña actualizada");
        }
    }
    Ok(())
}
