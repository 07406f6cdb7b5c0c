//! Tipjar CLI
//!
//! Command-line interface for the tipjar API.

use anyhow::Result;
use clap::{Parser, Subcommand};

use tipjar_client::TipjarClient;
use tipjar_types::{DonationId, DonationMessageRequest, MemberId, YearMonth};

#[derive(Parser)]
#[command(name = "tipjar")]
#[command(author, version, about = "Tipjar API CLI client", long_about = None)]
struct Cli {
    /// Base URL of the tipjar API
    #[arg(long, env = "TIPJAR_API_URL", default_value = "http://localhost:3000")]
    api_url: String,

    /// Bearer token (member access token or admin token)
    #[arg(long, env = "TIPJAR_ACCESS_TOKEN")]
    access_token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Member operations
    Member {
        #[command(subcommand)]
        action: MemberCommands,
    },
    /// Donation operations
    Donation {
        #[command(subcommand)]
        action: DonationCommands,
    },
    /// Exchange (payout) operations
    Exchange {
        #[command(subcommand)]
        action: ExchangeCommands,
    },
    /// Payment operations
    Payment {
        #[command(subcommand)]
        action: PaymentCommands,
    },
    /// Back-office operations (requires the admin token)
    Admin {
        #[command(subcommand)]
        action: AdminCommands,
    },
    /// Check API health
    Health,
}

#[derive(Subcommand)]
enum MemberCommands {
    /// Sign up a new member
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long)]
        nickname: String,
        #[arg(long)]
        page_name: String,
    },
    /// Show a creator's public page
    Get {
        /// Page name
        page_name: String,
    },
    /// Show the authenticated member
    Me,
    /// Update nickname and/or bio
    UpdateProfile {
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
    /// Show the exchangeable point balance
    Point,
    /// Submit a payout bank account for review
    RegisterAccount {
        #[arg(long)]
        holder: String,
        #[arg(long)]
        number: String,
        #[arg(long)]
        bank_code: String,
        #[arg(long)]
        bankbook_image_url: Option<String>,
    },
}

#[derive(Subcommand)]
enum DonationCommands {
    /// Donate points to a creator's page
    Send {
        #[arg(long)]
        page_name: String,
        #[arg(long)]
        point: i64,
        /// Display name shown with the message
        #[arg(long)]
        name: Option<String>,
        /// Message body
        #[arg(long)]
        text: Option<String>,
        /// Mark the message as secret (visible only to the creator)
        #[arg(long)]
        secret: bool,
    },
    /// Attach a message to an existing donation
    Message {
        /// Donation ID (UUID)
        #[arg(long)]
        donation: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        text: String,
        #[arg(long)]
        secret: bool,
    },
    /// List donations on a creator's page
    List {
        /// Page name
        page_name: String,
    },
}

#[derive(Subcommand)]
enum ExchangeCommands {
    /// Request a payout of the accumulated points
    Request {
        /// Settlement month, e.g. 2024-01 (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
}

#[derive(Subcommand)]
enum PaymentCommands {
    /// Start a point top-up payment
    Create {
        #[arg(long)]
        item_price: i64,
        #[arg(long)]
        item_name: String,
    },
    /// Verify a payment after checkout
    Verify {
        /// Merchant UID (UUID)
        merchant_uid: String,
    },
    /// Refund a payment within the guarantee window
    Refund {
        /// Merchant UID (UUID)
        merchant_uid: String,
    },
}

#[derive(Subcommand)]
enum AdminCommands {
    /// List bank accounts waiting for review
    ListAccounts,
    /// List waiting payout requests
    ListExchanges,
    /// Approve a pending bank account
    ApproveAccount {
        /// Member ID (UUID)
        member: String,
    },
    /// Reject a pending bank account
    RejectAccount {
        /// Member ID (UUID)
        member: String,
        #[arg(long)]
        reason: String,
    },
    /// Approve a creator's waiting exchange
    ApproveExchange {
        /// Creator's page name
        page_name: String,
        /// Approval month, e.g. 2024-02 (defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },
    /// Reject a creator's waiting exchange
    RejectExchange {
        /// Creator's page name
        page_name: String,
        #[arg(long)]
        reason: String,
    },
}

fn parse_member_id(s: &str) -> Result<MemberId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid member ID: {}", s))
}

fn parse_donation_id(s: &str) -> Result<DonationId> {
    s.parse()
        .map_err(|_| anyhow::anyhow!("Invalid donation ID: {}", s))
}

fn parse_month(s: Option<String>) -> Result<Option<YearMonth>> {
    s.map(|m| {
        m.parse()
            .map_err(|_| anyhow::anyhow!("Invalid month: {} (expected YYYY-MM)", m))
    })
    .transpose()
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let mut client = TipjarClient::new(&cli.api_url);
    if let Some(token) = cli.access_token {
        client = client.with_access_token(token);
    }

    match cli.command {
        Commands::Health => {
            let healthy = client.health().await?;
            if healthy {
                println!("✓ API is healthy");
            } else {
                println!("✗ API is not healthy");
                std::process::exit(1);
            }
        }

        Commands::Member { action } => match action {
            MemberCommands::Signup {
                email,
                nickname,
                page_name,
            } => {
                let resp = client.signup(&email, &nickname, &page_name).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            MemberCommands::Get { page_name } => {
                let resp = client.member_page(&page_name).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            MemberCommands::Me => {
                let resp = client.me().await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            MemberCommands::UpdateProfile { nickname, bio } => {
                let resp = client.update_profile(nickname, bio).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            MemberCommands::Point => {
                let resp = client.my_point().await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            MemberCommands::RegisterAccount {
                holder,
                number,
                bank_code,
                bankbook_image_url,
            } => {
                client
                    .register_account(&holder, &number, &bank_code, bankbook_image_url)
                    .await?;
                println!("✓ Account submitted for review");
            }
        },

        Commands::Donation { action } => match action {
            DonationCommands::Send {
                page_name,
                point,
                name,
                text,
                secret,
            } => {
                let message = match (name, text) {
                    (Some(name), Some(text)) => {
                        Some(DonationMessageRequest { name, text, secret })
                    }
                    (None, None) => None,
                    _ => anyhow::bail!("--name and --text must be given together"),
                };
                let resp = client.donate(&page_name, point, message).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            DonationCommands::Message {
                donation,
                name,
                text,
                secret,
            } => {
                let donation_id = parse_donation_id(&donation)?;
                client
                    .add_donation_message(donation_id, &name, &text, secret)
                    .await?;
                println!("✓ Message attached");
            }
            DonationCommands::List { page_name } => {
                let resp = client.page_donations(&page_name).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
        },

        Commands::Exchange { action } => match action {
            ExchangeCommands::Request { month } => {
                let month = parse_month(month)?;
                let resp = client.request_exchange(month).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
        },

        Commands::Payment { action } => match action {
            PaymentCommands::Create {
                item_price,
                item_name,
            } => {
                let resp = client.create_payment(item_price, &item_name).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            PaymentCommands::Verify { merchant_uid } => {
                let resp = client.verify_payment(merchant_uid.parse()?).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            PaymentCommands::Refund { merchant_uid } => {
                let resp = client.refund_payment(merchant_uid.parse()?).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
        },

        Commands::Admin { action } => match action {
            AdminCommands::ListAccounts => {
                let resp = client.admin_list_accounts().await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            AdminCommands::ListExchanges => {
                let resp = client.admin_list_exchanges().await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            AdminCommands::ApproveAccount { member } => {
                let member_id = parse_member_id(&member)?;
                client.admin_approve_account(member_id).await?;
                println!("✓ Account approved");
            }
            AdminCommands::RejectAccount { member, reason } => {
                let member_id = parse_member_id(&member)?;
                client.admin_reject_account(member_id, &reason).await?;
                println!("✓ Account rejected");
            }
            AdminCommands::ApproveExchange { page_name, month } => {
                let month = parse_month(month)?;
                let resp = client.admin_approve_exchange(&page_name, month).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
            AdminCommands::RejectExchange { page_name, reason } => {
                let resp = client.admin_reject_exchange(&page_name, &reason).await?;
                println!("{}", serde_json::to_string_pretty(&resp)?);
            }
        },
    }

    Ok(())
}
