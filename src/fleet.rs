//! Fleet-level helpers for driving many facilities through one step
//!
//! Facilities share nothing, so request and bid building fan out across
//! rayon workers. Small fleets stay sequential.

use rayon::prelude::*;
use tracing::debug;

use crate::error::Result;
use crate::exchange::{BidPortfolio, ExchangeContext, RequestPortfolio};
use crate::facility::{EnrichmentFacility, Trader};

/// Below this many facilities the rayon overhead is not worth paying
const PARALLEL_THRESHOLD: usize = 16;

/// Request portfolios of every facility
pub fn collect_requests(facilities: &[EnrichmentFacility]) -> Result<Vec<RequestPortfolio>> {
    let nested: Vec<Vec<RequestPortfolio>> = if facilities.len() > PARALLEL_THRESHOLD {
        facilities
            .par_iter()
            .map(|f| f.add_matl_requests())
            .collect::<Result<_>>()?
    } else {
        facilities
            .iter()
            .map(|f| f.add_matl_requests())
            .collect::<Result<_>>()?
    };

    let ports: Vec<RequestPortfolio> = nested.into_iter().flatten().collect();
    debug!(
        facilities = facilities.len(),
        portfolios = ports.len(),
        "Collected request portfolios"
    );
    Ok(ports)
}

/// Bid portfolios of every facility against one exchange context
pub fn collect_bids(
    facilities: &[EnrichmentFacility],
    ctx: &ExchangeContext,
) -> Result<Vec<BidPortfolio>> {
    let nested: Vec<Vec<BidPortfolio>> = if facilities.len() > PARALLEL_THRESHOLD {
        facilities
            .par_iter()
            .map(|f| f.add_matl_bids(ctx))
            .collect::<Result<_>>()?
    } else {
        facilities
            .iter()
            .map(|f| f.add_matl_bids(ctx))
            .collect::<Result<_>>()?
    };

    let ports: Vec<BidPortfolio> = nested.into_iter().flatten().collect();
    debug!(
        facilities = facilities.len(),
        requests = ctx.len(),
        portfolios = ports.len(),
        "Collected bid portfolios"
    );
    Ok(ports)
}

/// Start a step on every facility
pub fn tick_all(facilities: &mut [EnrichmentFacility], time: u64) {
    facilities.par_iter_mut().for_each(|f| f.tick(time));
}

/// End a step on every facility
pub fn tock_all(facilities: &mut [EnrichmentFacility], time: u64) {
    facilities.par_iter_mut().for_each(|f| f.tock(time));
}
