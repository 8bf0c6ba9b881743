use clap::Args;
use serde_json::json;
use std::sync::Arc;

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::database::postgres::PgStore;
use crate::services::account_service::RegisterRequest;
use crate::services::{AccountService, LogMailer};

#[derive(Debug, Args)]
pub struct CreateAdminArgs {
    #[arg(long)]
    pub email: String,

    #[arg(long, env = "POSTERCTL_ADMIN_PASSWORD", help = "Password (or POSTERCTL_ADMIN_PASSWORD)")]
    pub password: String,

    #[arg(long, default_value = "")]
    pub whatsapp_number: String,

    #[arg(long, default_value = "")]
    pub first_name: String,

    #[arg(long, default_value = "")]
    pub last_name: String,
}

pub async fn handle(args: CreateAdminArgs, output_format: OutputFormat) -> anyhow::Result<()> {
    let db = Arc::new(PgStore::new());
    let accounts = AccountService::new(db.clone(), db, Arc::new(LogMailer));

    let user = accounts
        .create_user(RegisterRequest {
            email: args.email,
            password: args.password,
            first_name: args.first_name,
            last_name: args.last_name,
            user_type: "admin".to_string(),
            whatsapp_number: args.whatsapp_number,
            address: None,
            pincode: None,
            city: None,
            dob: None,
            business_category_id: None,
            no_of_post: None,
        })
        .await?;

    output_success(
        output_format,
        &format!("Created admin {} ({})", user.id, user.email),
        Some(json!({ "id": user.id, "email": user.email })),
    )
}
