// AgriCred Scoring Service - Command line
//
//   agricred import <profiles.csv>   score every row and store it
//   agricred list [asc|desc]         print stored records by repayment class
//   agricred show <username>         print one stored record as JSON

use agricred_score::{open_reconciler, BorrowerProfile, RecordReconciler, ServiceConfig, SortOrder};
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().collect();
    let config = ServiceConfig::from_env()?;

    match args.get(1).map(String::as_str) {
        Some("import") => {
            let csv_path = args.get(2).ok_or_else(|| anyhow!("usage: agricred import <profiles.csv>"))?;
            run_import(&config, Path::new(csv_path))
        }
        Some("list") => {
            let order = match args.get(2) {
                Some(raw) => raw.parse::<SortOrder>().map_err(|e| anyhow!(e))?,
                None => SortOrder::default(),
            };
            run_list(&config, order)
        }
        Some("show") => {
            let username = args.get(2).ok_or_else(|| anyhow!("usage: agricred show <username>"))?;
            run_show(&config, username)
        }
        _ => {
            eprintln!("AgriCred scoring v{}", agricred_score::VERSION);
            eprintln!("usage:");
            eprintln!("  agricred import <profiles.csv>");
            eprintln!("  agricred list [asc|desc]");
            eprintln!("  agricred show <username>");
            bail!("no command given")
        }
    }
}

fn run_import(config: &ServiceConfig, csv_path: &Path) -> Result<()> {
    println!("🌾 Profile Import - CSV → score → SQLite");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");

    // 1. Load CSV
    println!("\n📂 Loading CSV...");
    let profiles = load_profiles(csv_path)?;
    println!("✓ Loaded {} profiles from {:?}", profiles.len(), csv_path);

    // 2. Open store + model
    println!("\n🔧 Opening record store and model...");
    let reconciler = open_reconciler(config)?;
    println!("✓ Database: {:?}", config.db_path);
    println!("✓ Model:    {:?}", config.model_path);

    // 3. Score and save
    println!("\n💾 Scoring profiles...");
    let mut saved = 0usize;
    let mut failed = 0usize;
    for profile in profiles {
        let username = profile.username.clone();
        match reconciler.create(profile) {
            Ok(record) => {
                saved += 1;
                println!(
                    "  {:<20} score {:>8.2}  class {}",
                    record.username, record.credit_score, record.repayment_class
                );
            }
            Err(e) => {
                failed += 1;
                eprintln!("  ❌ {}: {}", username, e);
            }
        }
    }

    // 4. Summary
    println!("\n━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("✅ Saved {} profiles", saved);
    if failed > 0 {
        println!("⚠️  {} profiles failed to score", failed);
    }

    Ok(())
}

fn load_profiles(path: &Path) -> Result<Vec<BorrowerProfile>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV {}", path.display()))?;

    let mut profiles = Vec::new();
    for (index, row) in reader.deserialize::<BorrowerProfile>().enumerate() {
        // Row 1 is the header
        let profile = row.with_context(|| format!("Invalid profile on CSV row {}", index + 2))?;
        profiles.push(profile);
    }

    Ok(profiles)
}

fn run_list(config: &ServiceConfig, order: SortOrder) -> Result<()> {
    let reconciler = open_reconciler(config)?;
    print_records(&reconciler, order)
}

fn print_records(reconciler: &RecordReconciler, order: SortOrder) -> Result<()> {
    let records = reconciler.list(order)?;

    println!("📊 {} stored records", records.len());
    println!("{:<20} {:>10} {:>6}", "username", "score", "class");
    for record in &records {
        println!(
            "{:<20} {:>10.2} {:>6}",
            record.username, record.credit_score, record.repayment_class
        );
    }

    Ok(())
}

fn run_show(config: &ServiceConfig, username: &str) -> Result<()> {
    let reconciler = open_reconciler(config)?;
    let record = reconciler.lookup(username)?;
    println!("{}", serde_json::to_string_pretty(&record)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "Username,Password,FirstName,LastName,Age,Gender,Education,Marital_Status,Region,State,Farm_Size,Crop_Type,Livestock_Type,Livestock_Number,Irrigation,Crop_Cycles,Technology_Use,Previous_Loans,Loan_Amount,Repayment_Status,Savings_Behavior,Financial_Access,Annual_Income,Extension_Services,Market_Distance,Yield_Per_Season,Input_Usage,Labor";

    #[test]
    fn test_load_profiles_from_csv() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "musa,pw,Musa,Ibrahim,38,Male,Primary,Married,North West,Kano,4.0,Sorghum,Cattle,9,No,1,No,Yes,50000,Late,Yes,No,300000,No,8.5,2.1,Some,Family").unwrap();
        writeln!(file, "ngozi,,Ngozi,Okafor,29,Female,Tertiary,Single,South East,Enugu,1.5,Cassava,Poultry,40,Yes,2,Yes,No,0,Paid on Time,Yes,Yes,420000,Yes,2.0,6.3,All,Hired").unwrap();

        let profiles = load_profiles(file.path()).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].username, "musa");
        assert_eq!(profiles[0].password.as_deref(), Some("pw"));
        assert_eq!(profiles[1].password, None);
        assert_eq!(profiles[1].repayment_status, "Paid on Time");
    }

    #[test]
    fn test_load_profiles_reports_bad_row() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{}", HEADER).unwrap();
        writeln!(file, "musa,pw,Musa,Ibrahim,old,Male,Primary,Married,North West,Kano,4.0,Sorghum,Cattle,9,No,1,No,Yes,50000,Late,Yes,No,300000,No,8.5,2.1,Some,Family").unwrap();

        let err = load_profiles(file.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("row 2"));
    }
}
