//! potsplit CLI
//!
//! Compute balances and settle-up plans for an expense pot from the
//! command line.
//!
//! # Usage
//!
//! ```bash
//! # Net balance of every member
//! potsplit balances --input pot.json
//!
//! # Suggested payments, as JSON
//! potsplit settle --input pot.json --format json
//!
//! # Generate a random pot for testing
//! potsplit generate --members 6 --expenses 40 --seed 7
//! ```

use potsplit_engine::config::EngineConfig;
use potsplit_engine::core::currency::CurrencyCode;
use potsplit_engine::core::expense::ExpenseDraft;
use potsplit_engine::core::member::{Member, MemberId};
use potsplit_engine::core::pot::{Pot, PotId};
use potsplit_engine::core::settlement::{PaymentMethod, Settlement};
use potsplit_engine::core::split::SplitStrategy;
use potsplit_engine::ledger::recorder::apply_settlement;
use potsplit_engine::optimization::plan::SettlementPlan;
use potsplit_engine::simulation::pot_generator::{generate_random_pot, PotConfig};
use rust_decimal::Decimal;
use std::fs;
use std::process;

fn print_usage() {
    eprintln!(
        r#"potsplit — balances and settle-up plans for shared expense pots

USAGE:
    potsplit <COMMAND> [OPTIONS]

COMMANDS:
    balances    Show every member's net balance per currency
    settle      Suggest the payments that settle everyone up
    generate    Generate a random pot (for testing)
    help        Show this message

OPTIONS (balances, settle):
    --input <FILE>      Path to JSON pot file
    --format <FORMAT>   Output format: text (default) or json
    --config <FILE>     TOML engine configuration

OPTIONS (generate):
    --members <N>       Number of members (default: 6)
    --expenses <N>      Number of expenses (default: 20)
    --settlements <N>   Number of random settlements (default: 0)
    --currencies <LIST> Comma-separated currency codes (default: USD)
    --seed <N>          Seed for a reproducible pot
    --output <FILE>     Write to file instead of stdout

EXAMPLES:
    potsplit balances --input pot.json
    potsplit settle --input pot.json --format json
    potsplit generate --members 4 --expenses 12 --currencies USD,EUR --output pot.json"#
    );
}

/// JSON schema for a pot file.
#[derive(serde::Serialize, serde::Deserialize)]
struct PotFile {
    #[serde(default = "default_pot_id")]
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    base_currency: Option<String>,
    members: Vec<MemberInput>,
    #[serde(default)]
    expenses: Vec<ExpenseDraft>,
    #[serde(default)]
    settlements: Vec<SettlementInput>,
}

fn default_pot_id() -> String {
    "pot".to_string()
}

#[derive(serde::Serialize, serde::Deserialize)]
struct MemberInput {
    id: String,
    #[serde(default)]
    name: Option<String>,
}

#[derive(serde::Serialize, serde::Deserialize)]
struct SettlementInput {
    from: String,
    to: String,
    amount: Decimal,
    #[serde(default)]
    currency: Option<String>,
    #[serde(default)]
    method: Option<PaymentMethod>,
}

/// JSON output schema for balances.
#[derive(serde::Serialize)]
struct BalanceOutput {
    member: String,
    currency: String,
    balance: String,
    status: String,
}

struct IoArgs {
    input: String,
    format: String,
    config: EngineConfig,
}

fn parse_io_args(args: &[String]) -> IoArgs {
    let mut input_path = None;
    let mut format = "text".to_string();
    let mut config_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--input" => {
                i += 1;
                input_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--input requires a file path");
                    process::exit(1);
                }));
            }
            "--format" => {
                i += 1;
                format = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--format requires 'text' or 'json'");
                    process::exit(1);
                });
            }
            "--config" => {
                i += 1;
                config_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--config requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    let input = input_path.unwrap_or_else(|| {
        eprintln!("Error: --input <FILE> is required");
        process::exit(1);
    });

    IoArgs {
        input,
        format,
        config: load_config(config_path.as_deref()),
    }
}

fn load_config(path: Option<&str>) -> EngineConfig {
    let loaded = match path {
        Some(path) => EngineConfig::from_file(path).and_then(|mut c| {
            c.apply_env()?;
            Ok(c)
        }),
        None => EngineConfig::from_env(),
    };
    let config = loaded.unwrap_or_else(|e| {
        eprintln!("Error loading configuration: {}", e);
        process::exit(1);
    });
    init_logging(&config);
    config
}

fn init_logging(config: &EngineConfig) {
    let env = env_logger::Env::default().default_filter_or(config.log_level.as_str());
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn load_pot(path: &str, config: &EngineConfig) -> Pot {
    let content = fs::read_to_string(path).unwrap_or_else(|e| {
        eprintln!("Error reading file '{}': {}", path, e);
        process::exit(1);
    });

    let file: PotFile = serde_json::from_str(&content).unwrap_or_else(|e| {
        eprintln!("Error parsing JSON: {}", e);
        eprintln!("Expected format:");
        eprintln!(r#"{{
  "id": "lisbon",
  "members": [{{ "id": "ana" }}, {{ "id": "ben" }}],
  "expenses": [
    {{ "payer": "ana", "total": "60", "currency": "EUR",
      "split": {{ "type": "equal", "members": ["ana", "ben"] }} }}
  ],
  "settlements": [{{ "from": "ben", "to": "ana", "amount": "10" }}]
}}"#);
        process::exit(1);
    });

    let default_currency = config.default_currency();
    let base = file
        .base_currency
        .map(CurrencyCode::new)
        .unwrap_or_else(|| default_currency.clone());
    let pot_id = PotId::new(file.id);
    let mut pot = Pot::new(pot_id.clone(), file.name, base.clone());

    for m in file.members {
        let name = m.name.unwrap_or_else(|| m.id.clone());
        pot.add_member(Member::new(MemberId::new(m.id), name, base.clone()))
            .unwrap_or_else(|e| exit_with(e));
    }

    for (n, draft) in file.expenses.into_iter().enumerate() {
        let expense = draft
            .into_expense(pot_id.clone(), &default_currency, config.split_tolerance_minor_units)
            .unwrap_or_else(|e| {
                eprintln!("Invalid expense #{}: {}", n + 1, e);
                process::exit(1);
            });
        pot.add_expense(expense).unwrap_or_else(|e| exit_with(e));
    }

    for s in file.settlements {
        let currency = s
            .currency
            .map(CurrencyCode::new)
            .unwrap_or_else(|| default_currency.clone());
        let mut settlement = Settlement::new(
            pot_id.clone(),
            MemberId::new(s.from),
            MemberId::new(s.to),
            s.amount,
            currency,
        );
        if let Some(method) = s.method {
            settlement = settlement.with_method(method);
        }
        pot = apply_settlement(settlement, &pot).unwrap_or_else(|e| exit_with(e));
    }

    pot
}

fn exit_with(err: impl std::fmt::Display) -> ! {
    eprintln!("Error: {}", err);
    process::exit(1);
}

fn to_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|e| exit_with(e))
}

fn cmd_balances(args: &[String]) {
    let io = parse_io_args(args);
    let pot = load_pot(&io.input, &io.config);
    let balances = pot.balances().unwrap_or_else(|e| exit_with(e));

    if io.format == "json" {
        let mut output = Vec::new();
        for currency in balances.currencies() {
            if let Some(positions) = balances.for_currency(currency) {
                for (member, amount) in positions {
                    output.push(BalanceOutput {
                        member: member.to_string(),
                        currency: currency.to_string(),
                        balance: amount.to_string(),
                        status: status(*amount).to_string(),
                    });
                }
            }
        }
        println!("{}", to_json(&output));
    } else {
        println!("=== Balances: {} ===", pot.id());
        if balances.currencies().next().is_none() {
            println!("No expenses recorded.");
        }
        for currency in balances.currencies() {
            println!("\n--- {} ---", currency);
            if let Some(positions) = balances.for_currency(currency) {
                for (member, amount) in positions {
                    let name = pot
                        .member(member)
                        .map(|m| m.display_name())
                        .unwrap_or_else(|| member.as_str());
                    println!("  {:<16} {:>14}  {}", name, amount.to_string(), status(*amount));
                }
            }
        }
    }
}

fn status(amount: Decimal) -> &'static str {
    if amount > Decimal::ZERO {
        "is owed"
    } else if amount < Decimal::ZERO {
        "owes"
    } else {
        "settled"
    }
}

fn cmd_settle(args: &[String]) {
    let io = parse_io_args(args);
    let pot = load_pot(&io.input, &io.config);
    let plan = SettlementPlan::build(&pot).unwrap_or_else(|e| exit_with(e));

    if io.format == "json" {
        println!("{}", to_json(&plan));
    } else {
        print!("{}", plan);
    }
}

fn cmd_generate(args: &[String]) {
    let mut config = PotConfig::default();
    let mut currencies_str = "USD".to_string();
    let mut output_path: Option<String> = None;
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--members" => {
                i += 1;
                config.member_count = parse_number(args.get(i), "--members");
            }
            "--expenses" => {
                i += 1;
                config.expense_count = parse_number(args.get(i), "--expenses");
            }
            "--settlements" => {
                i += 1;
                config.settlement_count = parse_number(args.get(i), "--settlements");
            }
            "--seed" => {
                i += 1;
                config.seed = Some(parse_number(args.get(i), "--seed"));
            }
            "--currencies" => {
                i += 1;
                currencies_str = args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--currencies requires a comma-separated list");
                    process::exit(1);
                });
            }
            "--output" => {
                i += 1;
                output_path = Some(args.get(i).cloned().unwrap_or_else(|| {
                    eprintln!("--output requires a file path");
                    process::exit(1);
                }));
            }
            _ => {
                eprintln!("Unknown option: {}", args[i]);
                process::exit(1);
            }
        }
        i += 1;
    }

    init_logging(&EngineConfig::default());
    config.currencies = currencies_str
        .split(',')
        .map(|s| CurrencyCode::new(s.trim()))
        .collect();

    let pot = generate_random_pot(&config);
    let file = PotFile {
        id: pot.id().to_string(),
        name: pot.name().to_string(),
        base_currency: Some(pot.base_currency().to_string()),
        members: pot
            .members()
            .iter()
            .map(|m| MemberInput {
                id: m.id().to_string(),
                name: Some(m.display_name().to_string()),
            })
            .collect(),
        expenses: pot
            .expenses()
            .iter()
            .map(|e| ExpenseDraft {
                description: e.description().to_string(),
                payer: e.payer().clone(),
                total: e.total(),
                currency: Some(e.currency().clone()),
                split: SplitStrategy::Exact {
                    amounts: e
                        .splits()
                        .iter()
                        .map(|s| (s.member.clone(), s.amount))
                        .collect(),
                },
            })
            .collect(),
        settlements: pot
            .settlements()
            .iter()
            .map(|s| SettlementInput {
                from: s.from().to_string(),
                to: s.to().to_string(),
                amount: s.amount(),
                currency: Some(s.currency().to_string()),
                method: s.method().cloned(),
            })
            .collect(),
    };

    let json = to_json(&file);

    if let Some(path) = output_path {
        fs::write(&path, &json).unwrap_or_else(|e| {
            eprintln!("Error writing to '{}': {}", path, e);
            process::exit(1);
        });
        eprintln!(
            "Generated {} expenses across {} members → {}",
            pot.expenses().len(),
            pot.members().len(),
            path
        );
    } else {
        println!("{}", json);
    }
}

fn parse_number<T: std::str::FromStr>(value: Option<&String>, flag: &str) -> T {
    value.and_then(|s| s.parse().ok()).unwrap_or_else(|| {
        eprintln!("{} requires a number", flag);
        process::exit(1);
    })
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        process::exit(1);
    }

    let command = args[1].as_str();
    let rest = &args[2..];

    match command {
        "balances" => cmd_balances(rest),
        "settle" => cmd_settle(rest),
        "generate" => cmd_generate(rest),
        "help" | "--help" | "-h" => print_usage(),
        _ => {
            eprintln!("Unknown command: {}", command);
            print_usage();
            process::exit(1);
        }
    }
}
