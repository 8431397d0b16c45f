use std::error::Error;

use clap::{Args, Subcommand, ValueEnum};
use prioritycards_core::{
    rank_by_rice, rice_score, Card, CardPatch, CardStore, Config, Effort, NewCard, RemoteService,
    RestClient,
};
use serde::Serialize;
use tokio::runtime::Runtime;

use super::{connect, require_login, runtime, CliResult};

#[derive(Subcommand)]
pub enum CardAction {
    /// List cards
    List {
        /// Ordering (defaults to display.default_sort)
        #[arg(long, value_enum)]
        sort: Option<SortKey>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show one card
    Show {
        /// Card ID
        id: String,
    },
    /// Create a card
    Add {
        /// Card title
        title: String,
        #[command(flatten)]
        fields: CardFields,
    },
    /// Update fields of a card
    Update {
        /// Card ID
        id: String,
        /// New title
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: CardFields,
    },
    /// Delete a card
    Delete {
        /// Card ID
        id: String,
    },
    /// Compute a RICE score without touching the backend
    Score {
        #[arg(long)]
        reach: f64,
        /// 3, 2, 1, 0.5 or 0.25
        #[arg(long)]
        impact: f64,
        /// Percentage, 0-100
        #[arg(long)]
        confidence: f64,
        #[arg(long)]
        effort_months: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SortKey {
    /// Newest first
    Created,
    /// Highest RICE score first
    Score,
}

impl SortKey {
    fn from_config(config: &Config) -> Self {
        match config.display.default_sort.as_str() {
            "score" => SortKey::Score,
            _ => SortKey::Created,
        }
    }
}

/// Editable card fields shared by `add` and `update`.
#[derive(Args, Debug, Default)]
pub struct CardFields {
    /// Urgency, 1-10
    #[arg(long)]
    urgency: Option<i32>,
    /// Importance, 1-10
    #[arg(long)]
    important: Option<i32>,
    /// Effort rating (1-10) or category label
    #[arg(long)]
    effort: Option<Effort>,
    #[arg(long)]
    owner: Option<String>,
    /// Customer leads reached
    #[arg(long)]
    reach: Option<i64>,
    /// Impact multiplier: 3, 2, 1, 0.5 or 0.25
    #[arg(long)]
    impact: Option<f64>,
    /// Confidence percentage, 0-100
    #[arg(long)]
    confidence: Option<f64>,
    /// Person-months
    #[arg(long)]
    effort_months: Option<f64>,
}

impl CardFields {
    fn into_new_card(self, title: String) -> NewCard {
        let defaults = NewCard::new(title);
        NewCard {
            urgency: self.urgency.unwrap_or(defaults.urgency),
            important: self.important.unwrap_or(defaults.important),
            effort: self.effort.unwrap_or_else(|| defaults.effort.clone()),
            owner: self.owner.unwrap_or_else(|| defaults.owner.clone()),
            reach: self.reach.unwrap_or(defaults.reach),
            impact: self.impact.unwrap_or(defaults.impact),
            confidence: self.confidence.unwrap_or(defaults.confidence),
            effort_months: self.effort_months.unwrap_or(defaults.effort_months),
            ..defaults
        }
    }

    fn into_patch(self, title: Option<String>) -> CardPatch {
        CardPatch {
            title,
            urgency: self.urgency,
            important: self.important,
            effort: self.effort,
            owner: self.owner,
            reach: self.reach,
            impact: self.impact,
            confidence: self.confidence,
            effort_months: self.effort_months,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ScoredCard<'a> {
    #[serde(flatten)]
    card: &'a Card,
    rice_score: f64,
}

impl<'a> From<&'a Card> for ScoredCard<'a> {
    fn from(card: &'a Card) -> Self {
        Self {
            card,
            rice_score: card.rice_score(),
        }
    }
}

/// Loaded config plus a store bound to the configured backend. Fails when
/// nobody is logged in.
fn open_store() -> CliResult<(Config, CardStore<RestClient>, Runtime)> {
    let config = Config::load()?;
    require_login(&config)?;
    let remote = connect(&config)?;
    let store = CardStore::with_table(remote, config.backend.cards_table.clone());
    Ok((config, store, runtime()?))
}

pub fn run(action: CardAction) -> CliResult {
    match action {
        CardAction::List { sort, json } => {
            let (config, mut store, rt) = open_store()?;
            if !rt.block_on(store.fetch_all()) {
                return Err(status_error(&store));
            }
            let cards: Vec<&Card> = match sort.unwrap_or_else(|| SortKey::from_config(&config)) {
                SortKey::Created => store.cards().iter().collect(),
                SortKey::Score => rank_by_rice(store.cards()),
            };
            if json {
                let scored: Vec<ScoredCard> = cards.into_iter().map(ScoredCard::from).collect();
                println!("{}", serde_json::to_string_pretty(&scored)?);
            } else if cards.is_empty() {
                println!("No cards");
            } else {
                for card in cards {
                    println!("{}", summary_line(card));
                }
            }
        }
        CardAction::Show { id } => {
            let (_, mut store, rt) = open_store()?;
            if !rt.block_on(store.fetch_all()) {
                return Err(status_error(&store));
            }
            store.select(id.as_str());
            match store.selected_card() {
                Some(card) => {
                    println!("{}", serde_json::to_string_pretty(&ScoredCard::from(card))?)
                }
                None => return Err(format!("card not found: {id}").into()),
            }
        }
        CardAction::Add { title, fields } => {
            let card = fields.into_new_card(title);
            card.validate()?;
            let (_, mut store, rt) = open_store()?;
            let created = rt
                .block_on(store.insert(card))
                .map_err(|_| status_error(&store))?;
            println!("Card created: {}", created.id);
            println!("{}", serde_json::to_string_pretty(&ScoredCard::from(&created))?);
        }
        CardAction::Update { id, title, fields } => {
            let patch = fields.into_patch(title);
            if patch.is_empty() {
                return Err("nothing to update".into());
            }
            patch.validate()?;
            let (_, mut store, rt) = open_store()?;
            let updated = rt
                .block_on(store.update(&id, patch))
                .map_err(|_| status_error(&store))?;
            println!("Card updated:");
            println!("{}", serde_json::to_string_pretty(&ScoredCard::from(&updated))?);
        }
        CardAction::Delete { id } => {
            let (_, mut store, rt) = open_store()?;
            rt.block_on(store.delete(&id))
                .map_err(|_| status_error(&store))?;
            println!("Card deleted: {id}");
        }
        CardAction::Score {
            reach,
            impact,
            confidence,
            effort_months,
        } => {
            println!("{:.2}", rice_score(reach, impact, confidence, effort_months));
        }
    }
    Ok(())
}

/// The store's user-facing message for the last failed operation.
fn status_error<R: RemoteService>(store: &CardStore<R>) -> Box<dyn Error> {
    store
        .status()
        .error
        .unwrap_or_else(|| "remote operation failed".to_string())
        .into()
}

fn summary_line(card: &Card) -> String {
    format!(
        "{}  {:>10.2}  {}  [u{} i{} e{}]  {}",
        card.id,
        card.rice_score(),
        card.created_at.format("%Y-%m-%d"),
        card.urgency,
        card.important,
        card.effort,
        card.title,
    )
}
