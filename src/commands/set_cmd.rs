use chrono::{Local, NaiveDate};
use clap::{Args, Subcommand, ValueEnum};
use liftlog_core::record::record_from;
use liftlog_core::{CompletedSet, Record, RecordStore, Shape};
use serde_json::{json, Value};

use super::CommandError;
use crate::config::Config;

/// Local table holding completed sets.
const SETS: &str = "workout_log";

#[derive(Clone, ValueEnum, Default)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Args)]
pub struct SetCommand {
    #[command(subcommand)]
    pub command: SetSubcommand,
}

#[derive(Subcommand)]
pub enum SetSubcommand {
    /// Log a completed set
    Add {
        /// Exercise page ID
        #[arg(long)]
        exercise: String,

        /// Set number within the exercise
        #[arg(long = "set", value_name = "N")]
        set_number: i64,

        #[arg(long)]
        reps: i64,

        /// Weight lifted; omit for bodyweight sets
        #[arg(long)]
        weight: Option<f64>,

        /// Workout title
        #[arg(long)]
        workout: Option<String>,

        /// Date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Show logged sets for a day
    Get {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Only this set number
        #[arg(long = "set", value_name = "N")]
        set_number: Option<i64>,

        /// Only this exercise page ID
        #[arg(long)]
        exercise: Option<String>,

        /// Output format
        #[arg(long, short, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Change a logged set
    Update {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(long = "set", value_name = "N")]
        set_number: i64,

        /// Exercise page ID
        #[arg(long)]
        exercise: String,

        #[arg(long)]
        reps: Option<i64>,

        #[arg(long)]
        weight: Option<f64>,

        #[arg(long)]
        workout: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Remove a logged set
    Delete {
        /// Date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        #[arg(long = "set", value_name = "N")]
        set_number: i64,

        /// Exercise page ID
        #[arg(long)]
        exercise: String,
    },
}

/// Changes applied by `set update`.
#[derive(Debug, Default)]
struct SetChanges {
    reps: Option<i64>,
    weight: Option<f64>,
    workout: Option<String>,
    notes: Option<String>,
}

impl SetCommand {
    pub async fn run(&self, store: &RecordStore, config: &Config) -> Result<(), CommandError> {
        match &self.command {
            SetSubcommand::Add {
                exercise,
                set_number,
                reps,
                weight,
                workout,
                date,
                notes,
            } => {
                let date = match date {
                    Some(date) => date.clone(),
                    None => Local::now().date_naive().format("%Y-%m-%d").to_string(),
                };
                let set = CompletedSet {
                    workout_name: workout.clone().unwrap_or_default(),
                    exercise_id: exercise.clone(),
                    set_number: *set_number,
                    weight: *weight,
                    reps: *reps,
                    date,
                    page_id: None,
                    exercise_notes: notes.clone().unwrap_or_default(),
                };

                let record = add_set(store, config, set).await?;
                println!("Logged set:");
                println!();
                print_set(&record);
                Ok(())
            }
            SetSubcommand::Get {
                date,
                set_number,
                exercise,
                format,
            } => {
                let sets = get_sets(store, date, *set_number, exercise.as_deref()).await?;
                match format {
                    OutputFormat::Json => {
                        let json = serde_json::to_string_pretty(&sets)
                            .map_err(|e| CommandError::Invalid(e.to_string()))?;
                        println!("{}", json);
                    }
                    OutputFormat::Text => {
                        if sets.is_empty() {
                            println!("No sets logged for {}.", date);
                        }
                        for set in &sets {
                            print_set(set);
                        }
                    }
                }
                Ok(())
            }
            SetSubcommand::Update {
                date,
                set_number,
                exercise,
                reps,
                weight,
                workout,
                notes,
            } => {
                let changes = SetChanges {
                    reps: *reps,
                    weight: *weight,
                    workout: workout.clone(),
                    notes: notes.clone(),
                };
                let updated = update_set(store, date, *set_number, exercise, changes).await?;

                println!("Updated set:");
                println!();
                print_set(&updated);
                if updated.get("page_id").is_some_and(|id| !id.is_null()) {
                    println!();
                    println!("Note: this set is already in Notion; the change is local only.");
                }
                Ok(())
            }
            SetSubcommand::Delete {
                date,
                set_number,
                exercise,
            } => {
                if delete_set(store, date, *set_number, exercise).await? {
                    println!("Deleted set {} of {} on {}.", set_number, exercise, date);
                    Ok(())
                } else {
                    Err(CommandError::Invalid(format!(
                        "No set {} of {} logged on {}",
                        set_number, exercise, date
                    )))
                }
            }
        }
    }
}

/// Validates and stores a new set, creating the table on first use.
async fn add_set(
    store: &RecordStore,
    config: &Config,
    set: CompletedSet,
) -> Result<Record, CommandError> {
    validate(&set)?;

    if !store.table_exists(SETS).await? {
        store
            .create_table(SETS, Shape::CompletedSet, config.remote_id(SETS))
            .await?;
    }

    let record = to_record(&set)?;
    let partition = store.add(SETS, record).await?;

    match partition.inserted.into_iter().next() {
        Some(record) => Ok(record),
        None => Err(CommandError::Invalid(format!(
            "Set {} of {} on {} is already logged",
            set.set_number, set.exercise_id, set.date
        ))),
    }
}

async fn get_sets(
    store: &RecordStore,
    date: &str,
    set_number: Option<i64>,
    exercise: Option<&str>,
) -> Result<Vec<Record>, CommandError> {
    parse_date(date)?;
    if !store.table_exists(SETS).await? {
        return Ok(Vec::new());
    }

    let mut key = record_from(json!({ "date": date }));
    if let Some(set_number) = set_number {
        key.insert("set_number".to_string(), json!(set_number));
    }
    if let Some(exercise) = exercise {
        key.insert("exercise_id".to_string(), json!(exercise));
    }

    Ok(store.get(SETS, &key).await?)
}

async fn update_set(
    store: &RecordStore,
    date: &str,
    set_number: i64,
    exercise: &str,
    changes: SetChanges,
) -> Result<Record, CommandError> {
    let existing = get_sets(store, date, Some(set_number), Some(exercise))
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            CommandError::Invalid(format!(
                "No set {} of {} logged on {}",
                set_number, exercise, date
            ))
        })?;

    let mut set: CompletedSet = serde_json::from_value(Value::Object(existing))
        .map_err(|e| CommandError::Invalid(format!("Stored set is malformed: {}", e)))?;
    if let Some(reps) = changes.reps {
        set.reps = reps;
    }
    if let Some(weight) = changes.weight {
        set.weight = Some(weight);
    }
    if let Some(workout) = changes.workout {
        set.workout_name = workout;
    }
    if let Some(notes) = changes.notes {
        set.exercise_notes = notes;
    }
    validate(&set)?;

    let record = to_record(&set)?;
    store
        .update(SETS, &record)
        .await?
        .ok_or_else(|| CommandError::Invalid("Set disappeared during update".to_string()))
}

async fn delete_set(
    store: &RecordStore,
    date: &str,
    set_number: i64,
    exercise: &str,
) -> Result<bool, CommandError> {
    parse_date(date)?;
    if !store.table_exists(SETS).await? {
        return Ok(false);
    }

    let key = record_from(json!({
        "date": date,
        "set_number": set_number,
        "exercise_id": exercise,
    }));
    Ok(store.delete(SETS, &key).await?)
}

fn validate(set: &CompletedSet) -> Result<(), CommandError> {
    parse_date(&set.date)?;
    if set.exercise_id.trim().is_empty() {
        return Err(CommandError::Invalid("Exercise ID cannot be empty".to_string()));
    }
    if set.set_number < 1 {
        return Err(CommandError::Invalid("Set number must be at least 1".to_string()));
    }
    if set.reps < 0 {
        return Err(CommandError::Invalid("Reps cannot be negative".to_string()));
    }
    Ok(())
}

fn parse_date(date: &str) -> Result<NaiveDate, CommandError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| CommandError::Invalid(format!("Invalid date format '{}'. Use YYYY-MM-DD.", date)))
}

fn to_record(set: &CompletedSet) -> Result<Record, CommandError> {
    serde_json::to_value(set)
        .map(record_from)
        .map_err(|e| CommandError::Invalid(e.to_string()))
}

fn text<'a>(record: &'a Record, field: &str) -> &'a str {
    record.get(field).and_then(Value::as_str).unwrap_or_default()
}

fn print_set(record: &Record) {
    let weight = match record.get("weight").and_then(Value::as_f64) {
        Some(weight) => format!(" @ {}", weight),
        None => String::new(),
    };
    let synced = if record.get("page_id").is_some_and(|id| !id.is_null()) {
        "synced"
    } else {
        "local"
    };

    println!(
        "  {}  set {}  {}  {} reps{}  [{}]",
        text(record, "date"),
        record.get("set_number").unwrap_or(&Value::Null),
        text(record, "exercise_id"),
        record.get("reps").unwrap_or(&Value::Null),
        weight,
        synced
    );
    if !text(record, "workout_name").is_empty() {
        println!("    Workout: {}", text(record, "workout_name"));
    }
    if !text(record, "exercise_notes").is_empty() {
        println!("    Notes:   {}", text(record, "exercise_notes"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use liftlog_core::Collection;
    use tempfile::TempDir;

    struct TestContext {
        store: RecordStore,
        config: Config,
        _temp_dir: TempDir,
    }

    async fn setup() -> TestContext {
        let temp_dir = TempDir::new().unwrap();
        let store = RecordStore::open(temp_dir.path().join("test.db"))
            .await
            .unwrap();
        let mut config = Config::load(Some(temp_dir.path().join("missing.yaml"))).unwrap();
        config.collections = vec![Collection::new(SETS, "db-sets")];
        TestContext {
            store,
            config,
            _temp_dir: temp_dir,
        }
    }

    fn bench_set(set_number: i64) -> CompletedSet {
        CompletedSet {
            workout_name: "Push Day".to_string(),
            exercise_id: "page-bench".to_string(),
            set_number,
            weight: Some(60.0),
            reps: 8,
            date: "2025-05-08".to_string(),
            page_id: None,
            exercise_notes: String::new(),
        }
    }

    #[tokio::test]
    async fn test_add_creates_table_with_remote_id() {
        let ctx = setup().await;

        let record = add_set(&ctx.store, &ctx.config, bench_set(1)).await.unwrap();

        assert_eq!(record["set_number"], 1);
        assert!(record["page_id"].is_null());
        let metadata = ctx.store.metadata(SETS).await.unwrap();
        assert_eq!(metadata.remote_id.as_deref(), Some("db-sets"));
    }

    #[tokio::test]
    async fn test_add_duplicate_set_fails() {
        let ctx = setup().await;
        add_set(&ctx.store, &ctx.config, bench_set(1)).await.unwrap();

        let result = add_set(&ctx.store, &ctx.config, bench_set(1)).await;

        assert!(matches!(result, Err(CommandError::Invalid(_))));
        assert_eq!(ctx.store.count(SETS).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_add_rejects_invalid_input() {
        let ctx = setup().await;

        let mut bad_date = bench_set(1);
        bad_date.date = "08/05/2025".to_string();
        assert!(add_set(&ctx.store, &ctx.config, bad_date).await.is_err());

        assert!(add_set(&ctx.store, &ctx.config, bench_set(0)).await.is_err());
        assert!(!ctx.store.table_exists(SETS).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_filters_by_key_fields() {
        let ctx = setup().await;
        add_set(&ctx.store, &ctx.config, bench_set(1)).await.unwrap();
        add_set(&ctx.store, &ctx.config, bench_set(2)).await.unwrap();

        let day = get_sets(&ctx.store, "2025-05-08", None, None).await.unwrap();
        assert_eq!(day.len(), 2);

        let second = get_sets(&ctx.store, "2025-05-08", Some(2), Some("page-bench"))
            .await
            .unwrap();
        assert_eq!(second.len(), 1);
        assert_eq!(second[0]["set_number"], 2);

        let other_day = get_sets(&ctx.store, "2025-05-09", None, None).await.unwrap();
        assert!(other_day.is_empty());
    }

    #[tokio::test]
    async fn test_get_before_any_set_is_empty() {
        let ctx = setup().await;
        let sets = get_sets(&ctx.store, "2025-05-08", None, None).await.unwrap();
        assert!(sets.is_empty());
    }

    #[tokio::test]
    async fn test_update_changes_fields_and_keeps_link() {
        let ctx = setup().await;
        let mut linked = bench_set(1);
        linked.page_id = Some("page-1".to_string());
        add_set(&ctx.store, &ctx.config, linked).await.unwrap();

        let changes = SetChanges {
            reps: Some(10),
            notes: Some("paused reps".to_string()),
            ..Default::default()
        };
        let updated = update_set(&ctx.store, "2025-05-08", 1, "page-bench", changes)
            .await
            .unwrap();

        assert_eq!(updated["reps"], 10);
        assert_eq!(updated["exercise_notes"], "paused reps");
        assert_eq!(updated["page_id"], "page-1");

        let stored = get_sets(&ctx.store, "2025-05-08", Some(1), None).await.unwrap();
        assert_eq!(stored[0]["reps"], 10);
    }

    #[tokio::test]
    async fn test_update_missing_set_fails() {
        let ctx = setup().await;
        add_set(&ctx.store, &ctx.config, bench_set(1)).await.unwrap();

        let result =
            update_set(&ctx.store, "2025-05-08", 5, "page-bench", SetChanges::default()).await;
        assert!(matches!(result, Err(CommandError::Invalid(_))));
    }

    #[tokio::test]
    async fn test_delete_removes_only_matching_set() {
        let ctx = setup().await;
        add_set(&ctx.store, &ctx.config, bench_set(1)).await.unwrap();
        add_set(&ctx.store, &ctx.config, bench_set(2)).await.unwrap();

        assert!(delete_set(&ctx.store, "2025-05-08", 1, "page-bench").await.unwrap());
        assert!(!delete_set(&ctx.store, "2025-05-08", 1, "page-bench").await.unwrap());

        let remaining = get_sets(&ctx.store, "2025-05-08", None, None).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0]["set_number"], 2);
    }
}
