//! Demo that ingests a few live catalog pages and prints top titles plus
//! recommendations for one query (RECOMMENDER_QUERY, default "Naruto").

use std::sync::Arc;

use anime_recommender::config::{IngestConfig, RecommenderConfig};
use anime_recommender::engine::Strategy;
use anime_recommender::ingest::jikan::JikanSource;
use anime_recommender::ingest::PageIngestor;
use anime_recommender::RecommendationEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let query = std::env::var("RECOMMENDER_QUERY").unwrap_or_else(|_| "Naruto".to_string());

    let cfg = RecommenderConfig {
        ingest: IngestConfig {
            max_pages: 4,
            max_items: 100,
            ..IngestConfig::default()
        },
        ..RecommenderConfig::default()
    };

    let source = Arc::new(JikanSource::from_config(&cfg.source)?);
    let ingestor = PageIngestor::new(source, cfg.ingest.clone());

    println!("fetching up to {} titles...", cfg.ingest.max_items);
    let run = ingestor.ingest().await;
    println!(
        "catalog: {} titles ({} pages, {} retries, {} duplicates dropped)",
        run.catalog.len(),
        run.stats.pages_fetched,
        run.stats.retries,
        run.stats.duplicates_skipped
    );

    if run.catalog.is_empty() {
        println!("nothing ingested, bailing out");
        return Ok(());
    }

    println!("\ntop 5 by rating:");
    for t in run.catalog.top(5) {
        println!("  {:<45} {:>4.2}  {}", t.name, t.rating_or_zero(), t.kind);
    }

    let engine = RecommendationEngine::build(run.catalog, &cfg.features, &cfg.similarity);

    for strategy in [Strategy::Hybrid, Strategy::NearestNeighbor] {
        match engine.recommend(&query, strategy, Some(5)) {
            Ok(ranked) => {
                println!(
                    "\n{} recommendations for {:?} ({}):",
                    ranked.entries.len(),
                    ranked.query.name,
                    ranked.strategy.label()
                );
                for r in &ranked.entries {
                    println!("  {:.3}  {}", r.score, r.title.name);
                }
            }
            Err(err) => {
                println!("\nno luck for {query:?}: {err}");
                let suggestions = engine.suggest(&query, 3);
                if !suggestions.is_empty() {
                    println!("did you mean: {}", suggestions.join(", "));
                }
            }
        }
    }

    println!("\nrecommend-demo done");
    Ok(())
}
