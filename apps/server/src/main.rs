use std::time::Duration;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use clinic_auth::{hash_password, normalize_email};
use clinic_backend_api::build_router;
use clinic_backend_runtime::{telemetry, BackendServices};
use clinic_config::{load as load_config, AppConfig};
use clinic_database::{
    prepare_database, run_migrations, AppointmentFilter, AppointmentRepository,
    AppointmentStatus, DatabaseError, HospitalFields, NewTimeSlot, NewUser, ReferenceRepository,
    SpecialityFields, TimeSlotRepository, UserRepository,
};
use tokio::net::TcpListener;
use tracing::info;

const DEMO_PASSWORD: &str = "password123";
const EXPIRY_PURGE_PERIOD: Duration = Duration::from_secs(15 * 60);

#[derive(Parser)]
#[command(name = "clinic-backend")]
#[command(about = "Clinic portal backend")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server (default)
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Insert demo hospitals, specialities, a doctor and a patient
    SeedData,
    /// Create a verified administrator account
    CreateAdmin {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Print appointments, optionally filtered
    DumpAppointments {
        #[arg(long, value_enum)]
        status: Option<StatusArg>,
        /// `YYYY-MM-DD`
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum StatusArg {
    Pending,
    Confirmed,
    Cancelled,
}

impl From<StatusArg> for AppointmentStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => AppointmentStatus::Pending,
            StatusArg::Confirmed => AppointmentStatus::Confirmed,
            StatusArg::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init_tracing().context("failed to initialise tracing")?;
    let config = load_config().context("failed to load configuration")?;

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server(config).await,
        Commands::Migrate => migrate(&config).await,
        Commands::SeedData => seed_data(&config).await,
        Commands::CreateAdmin {
            name,
            email,
            password,
        } => create_admin(&config, &name, &email, &password).await,
        Commands::DumpAppointments { status, date } => {
            dump_appointments(&config, status.map(AppointmentStatus::from), date).await
        }
    }
}

async fn run_server(config: AppConfig) -> anyhow::Result<()> {
    info!("starting clinic backend");

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let purge = services.spawn_expiry_purge(EXPIRY_PURGE_PERIOD);
    let app = build_router(services.app_state(&config));

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(clinic_backend_runtime::shutdown_signal())
        .await
        .context("http server error")?;

    purge.abort();
    info!("backend shut down");
    Ok(())
}

async fn migrate(config: &AppConfig) -> anyhow::Result<()> {
    let pool = prepare_database(&config.database).await?;
    run_migrations(&pool).await?;
    println!("Database at {} is up to date", config.database.url);
    Ok(())
}

async fn create_admin(
    config: &AppConfig,
    name: &str,
    email: &str,
    password: &str,
) -> anyhow::Result<()> {
    if password.chars().count() < 6 {
        anyhow::bail!("password must be at least 6 characters");
    }

    let services = BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")?;

    let users = UserRepository::new(services.db_pool.clone());
    let email = normalize_email(email);
    if users.find_by_email(&email).await?.is_some() {
        anyhow::bail!("a user with email {email} already exists");
    }

    let user = users
        .create(
            &NewUser {
                name: name.trim().to_string(),
                email,
                password_hash: Some(hash_password(password)?),
                phone: None,
                verified: true,
            },
            &["admin"],
        )
        .await
        .context("failed to create administrator")?;

    info!(user = %user.public_id, "administrator created");
    println!("Created administrator {} <{}>", user.name, user.email);
    Ok(())
}

/// Idempotent: rows that already exist are left alone.
async fn seed_data(config: &AppConfig) -> anyhow::Result<()> {
    info!("seeding database with demo data");

    let services = BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")?;
    let pool = &services.db_pool;
    let reference = ReferenceRepository::new(pool.clone());

    let mut hospitals = 0;
    for (name, address) in [
        ("Central Hospital", "1 Main Street"),
        ("Riverside Clinic", "22 River Road"),
    ] {
        let created = reference
            .create_hospital(&HospitalFields {
                name: name.to_string(),
                address: Some(address.to_string()),
                phone: None,
                email: None,
                description: None,
            })
            .await;
        match created {
            Ok(_) => hospitals += 1,
            Err(DatabaseError::Duplicate(_)) => {}
            Err(err) => return Err(err).context("failed to insert hospital"),
        }
    }

    let mut speciality_ids = Vec::new();
    for name in ["Cardiology", "Dermatology", "General Practice"] {
        let created = reference
            .create_speciality(&SpecialityFields {
                name: name.to_string(),
                description: None,
            })
            .await;
        match created {
            Ok(speciality) => speciality_ids.push(speciality.id),
            Err(DatabaseError::Duplicate(_)) => {}
            Err(err) => return Err(err).context("failed to insert speciality"),
        }
    }

    let users = UserRepository::new(pool.clone());
    let password_hash = hash_password(DEMO_PASSWORD)?;
    let mut accounts = Vec::new();
    for (name, email, role) in [
        ("Dr. Jane Doe", "doctor@clinic.local", "doctor"),
        ("John Patient", "patient@clinic.local", "patient"),
    ] {
        if users.find_by_email(email).await?.is_some() {
            continue;
        }
        let user = users
            .create(
                &NewUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash: Some(password_hash.clone()),
                    phone: None,
                    verified: true,
                },
                &[role],
            )
            .await
            .with_context(|| format!("failed to insert {role} account"))?;

        if role == "doctor" {
            users.replace_specialities(user.id, &speciality_ids).await?;
            let slots: Vec<NewTimeSlot> = ["09:00", "09:30", "10:00", "14:00"]
                .into_iter()
                .map(|time| NewTimeSlot {
                    time: time.to_string(),
                    duration_minutes: 30,
                })
                .collect();
            TimeSlotRepository::new(pool.clone())
                .replace_for_doctor(user.id, &slots)
                .await
                .context("failed to insert time slots")?;
        }
        accounts.push(email);
    }

    println!("Database seeded with demo data:");
    println!("- {hospitals} hospitals created");
    println!("- {} specialities created", speciality_ids.len());
    for email in accounts {
        println!("- account {email} (password {DEMO_PASSWORD})");
    }
    Ok(())
}

async fn dump_appointments(
    config: &AppConfig,
    status: Option<AppointmentStatus>,
    date: Option<String>,
) -> anyhow::Result<()> {
    let services = BackendServices::initialise(config)
        .await
        .context("failed to initialise backend services")?;

    let filter = AppointmentFilter {
        status,
        date,
        ..AppointmentFilter::default()
    };
    let appointments = AppointmentRepository::new(services.db_pool.clone())
        .list(&filter)
        .await
        .context("failed to fetch appointments")?;

    println!("=== APPOINTMENTS ===");
    if appointments.is_empty() {
        println!("No appointments found in database");
        return Ok(());
    }

    println!("Found {} appointments:", appointments.len());
    println!(
        "{:<26} {:<12} {:<6} {:<10} {:<25} {:<25}",
        "Public ID", "Date", "Time", "Status", "Doctor", "Patient"
    );
    println!("{}", "-".repeat(110));

    for appointment in appointments {
        println!(
            "{:<26} {:<12} {:<6} {:<10} {:<25} {:<25}",
            appointment.public_id,
            appointment.date,
            appointment.time,
            appointment.status.as_str(),
            appointment.doctor_name,
            appointment.patient_name
        );
    }

    Ok(())
}
