use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use tracing::info;

use super::common::{print_error, print_info, print_success, print_warning, prompt_confirm, prompt_secret, prompt_string};
use crate::api::models::UserType;
use crate::app::AppCore;
use crate::services::{AuthController, LocationChoice, ResolvedLocation};

/// Find and book trusted local service providers
#[derive(Parser, Debug)]
#[command(name = "servio", version, about = "Find and book trusted local service providers", long_about = None, disable_help_subcommand = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Sign in and store the session for the TUI
    Login {
        /// Sign in as a service provider
        #[arg(long)]
        provider: bool,
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout {
        /// Skip confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show the signed-in user
    Whoami {
        /// Print the stored user record as JSON
        #[arg(long)]
        json: bool,
    },
    /// List subscription plans for providers
    Plans,
    /// List service categories
    Categories {
        /// Show subcategories of the category with this id
        #[arg(long)]
        id: Option<String>,
        /// Show popular subcategories for this category name
        #[arg(long, conflicts_with = "id")]
        popular: Option<String>,
    },
    /// Search for a place, or detect the current location when no query is given
    Locate {
        /// Free-text place search, e.g. "lekki"
        query: Vec<String>,
    },
    /// Show your provider business profile
    Profile,
    /// Shows the log file location
    Logs,
    /// Configuration file location
    Config,
    /// Generate shell completions
    Completions {
        /// Target shell (detected from $SHELL when omitted)
        shell: Option<Shell>,
    },
}

impl Cli {
    /// Execute the CLI command. `None` is handled by the caller (TUI).
    pub fn execute(self) -> Result<()> {
        match self.command {
            Some(Commands::Login { provider, email }) => Self::cmd_login(provider, email),
            Some(Commands::Logout { yes }) => Self::cmd_logout(yes),
            Some(Commands::Whoami { json }) => Self::cmd_whoami(json),
            Some(Commands::Plans) => Self::cmd_plans(),
            Some(Commands::Categories { id, popular }) => Self::cmd_categories(id, popular),
            Some(Commands::Locate { query }) => Self::cmd_locate(&query.join(" ")),
            Some(Commands::Profile) => Self::cmd_profile(),
            Some(Commands::Logs) => Self::cmd_logs(),
            Some(Commands::Config) => Self::cmd_config(),
            Some(Commands::Completions { shell }) => super::completions::generate(shell),
            None => Ok(()),
        }
    }

    fn cmd_login(provider: bool, email: Option<String>) -> Result<()> {
        info!("CLI: login command executed");
        let mut core = AppCore::load()?;
        let user_type = if provider {
            UserType::Provider
        } else {
            UserType::Customer
        };

        let email = match email {
            Some(email) => email,
            None => prompt_string("Email", None)?,
        };
        let password = prompt_secret("Password")?;

        let controller = AuthController::new(
            core.api.clone(),
            core.config.google_client_id().map(str::to_string),
        );
        match core
            .runtime
            .block_on(controller.login(user_type, &email, &password))
        {
            Ok(session) => {
                let name = session.user.display_name().to_string();
                core.persist_session(session)
                    .context("Failed to store session")?;
                print_success(&format!("Signed in as {name} ({})", user_type.label()));
                Ok(())
            }
            Err(e) => {
                print_error(&e.user_message());
                std::process::exit(1);
            }
        }
    }

    fn cmd_logout(yes: bool) -> Result<()> {
        let mut core = AppCore::load()?;
        if core.session.current().is_none() {
            print_info("Not signed in");
            return Ok(());
        }
        if !yes && !prompt_confirm("Sign out of servio on this device?")? {
            return Ok(());
        }
        core.logout()?;
        print_success("Signed out");
        Ok(())
    }

    fn cmd_whoami(json: bool) -> Result<()> {
        let core = AppCore::load()?;
        let Some(session) = core.session.current() else {
            print_info("Not signed in. Run `servio login` first.");
            return Ok(());
        };

        if json {
            let user = core.session.user_json().unwrap_or_default();
            println!("{}", serde_json::to_string_pretty(&user)?);
        } else {
            println!("{}", session.user.display_name());
            println!("  email: {}", session.user.email);
            println!("  type:  {}", session.user_type().label());
        }
        Ok(())
    }

    fn cmd_plans() -> Result<()> {
        let core = AppCore::load()?;
        let plans = core
            .runtime
            .block_on(core.api.subscription_plans())
            .context("Failed to load subscription plans")?;

        if plans.is_empty() {
            print_warning("No subscription plans available");
        }
        for plan in plans {
            println!("{}  [{}]", plan.summary(), plan.id);
            for benefit in &plan.benefits {
                println!("    • {benefit}");
            }
        }
        Ok(())
    }

    fn cmd_categories(id: Option<String>, popular: Option<String>) -> Result<()> {
        let core = AppCore::load()?;
        let names: Vec<String> = if let Some(id) = id {
            core.runtime
                .block_on(core.api.subcategories(&id))
                .context("Failed to load subcategories")?
                .into_iter()
                .map(|s| s.name)
                .collect()
        } else if let Some(category) = popular {
            core.runtime
                .block_on(core.api.popular_subcategories(&category))
                .context("Failed to load popular subcategories")?
        } else {
            core.runtime
                .block_on(core.api.categories())
                .context("Failed to load categories")?
                .into_iter()
                .map(|c| format!("{}  [{}]", c.name, c.id))
                .collect()
        };

        for name in names {
            println!("{name}");
        }
        Ok(())
    }

    fn cmd_locate(query: &str) -> Result<()> {
        let core = AppCore::load()?;
        let resolver = &core.location;

        if query.trim().is_empty() {
            let resolved = core
                .runtime
                .block_on(resolver.resolve_location(LocationChoice::CurrentLocation));
            if let ResolvedLocation::Detected(record) = &resolved {
                println!("{}", record.address);
                println!("  {}, {} ({:.4}, {:.4})", record.city, record.state, record.latitude, record.longitude);
            }
            return Ok(());
        }

        let ticket = resolver.begin_search();
        let suggestions = core
            .runtime
            .block_on(resolver.suggestions(ticket, query))
            .unwrap_or_default();
        if suggestions.is_empty() {
            print_warning(&format!("No places match \"{query}\""));
        }
        for suggestion in suggestions {
            println!("{suggestion}");
        }
        Ok(())
    }

    fn cmd_profile() -> Result<()> {
        let core = AppCore::load()?;
        if core.session.current().is_none() {
            print_error("Not signed in. Run `servio login --provider` first.");
            std::process::exit(1);
        }

        let profile = core
            .runtime
            .block_on(core.api.fetch_profile())
            .context("Failed to load profile")?;

        println!("{}", profile.business_name);
        println!("  status:   {}", profile.verification_status.label());
        println!("  category: {}", profile.category);
        if !profile.subcategories.is_empty() {
            println!("  services: {}", profile.subcategories.join(", "));
        }
        if !profile.location_city.is_empty() {
            println!("  location: {}, {}", profile.location_city, profile.location_state);
        }
        if !profile.bio.is_empty() {
            println!("  about:    {}", profile.bio);
        }
        println!("  portfolio: {} image(s)", profile.portfolio.len());
        for url in &profile.portfolio {
            println!("    {url}");
        }
        Ok(())
    }

    fn cmd_logs() -> Result<()> {
        let log_file = crate::utils::get_log_dir().join("servio.log");
        println!("{}", log_file.display());
        Ok(())
    }

    fn cmd_config() -> Result<()> {
        println!("{}", crate::utils::get_config_path().display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_subcommand_launches_tui() {
        let cli = Cli::try_parse_from(["servio"]).expect("parse");
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_login_flags() {
        let cli = Cli::try_parse_from(["servio", "login", "--provider", "-e", "ada@example.com"])
            .expect("parse");
        match cli.command {
            Some(Commands::Login { provider, email }) => {
                assert!(provider);
                assert_eq!(email.as_deref(), Some("ada@example.com"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_locate_joins_words() {
        let cli = Cli::try_parse_from(["servio", "locate", "victoria", "island"]).expect("parse");
        match cli.command {
            Some(Commands::Locate { query }) => assert_eq!(query.join(" "), "victoria island"),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_categories_id_conflicts_with_popular() {
        assert!(Cli::try_parse_from(["servio", "categories", "--id", "1", "--popular", "Cleaning"])
            .is_err());
    }
}
