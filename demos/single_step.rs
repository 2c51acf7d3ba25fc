//! One exchange step against a single enrichment facility
//!
//! Run with: cargo run --example single_step
//! Set RUST_LOG=enrichment_facility=debug for per-trade logs.

use std::sync::Arc;

use enrichment_facility::exchange::{Bid, Request};
use enrichment_facility::metrics::FacilityMetrics;
use enrichment_facility::prelude::*;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let natl_u = Composition::from_atom([(NucId::U235, 0.0072), (NucId::U238, 0.9928)])?;
    let recipes = RecipeBook::new().with_recipe("natl_u", Arc::clone(&natl_u));
    let config = FacilityConfig::from_json_str(
        r#"{
            "in_commodity": "natl_u",
            "in_recipe": "natl_u",
            "out_commodity": "enr_u",
            "inventory_size": 100.0,
            "swu_capacity": 50.0,
            "tails_assay": 0.003
        }"#,
    )?;

    let metrics = Arc::new(FacilityMetrics::new()?);
    let mut facility =
        EnrichmentFacility::new(config, &recipes)?.with_metrics(Arc::clone(&metrics));
    info!("{}", facility.describe());

    facility.tick(0);

    // Feed side: a mine fills the whole request
    let mine = AgentId::new();
    let requests = facility.add_matl_requests()?;
    let mut responses = Vec::new();
    for port in &requests {
        for request in port.requests() {
            let qty = request.target().quantity();
            let feed = Material::new(qty, Arc::clone(&natl_u))?;
            let bid = Arc::new(Bid::new(Arc::clone(request), feed.clone(), mine));
            responses.push((Trade::new(Arc::clone(request), bid, qty), feed));
        }
    }
    facility.accept_matl_trades(responses)?;

    // Product side: a reactor asks for 3 kg of 4.5% LEU
    let reactor = AgentId::new();
    let leu = Composition::from_atom([(NucId::U235, 0.045), (NucId::U238, 0.955)])?;
    let mut ctx = ExchangeContext::new();
    ctx.add_request(Arc::new(Request::new(
        Material::new(3.0, leu)?,
        reactor,
        "enr_u",
    )));

    let bids = facility.add_matl_bids(&ctx)?;
    let trades: Vec<Trade> = bids
        .iter()
        .flat_map(|port| port.bids())
        .map(|bid| Trade::new(Arc::clone(bid.request()), Arc::clone(bid), 3.0))
        .collect();
    for (_, product) in facility.get_matl_trades(&trades)? {
        info!(qty = product.quantity(), "Shipped product");
    }

    facility.tock(0);
    println!("{}", metrics.gather_text()?);
    Ok(())
}
