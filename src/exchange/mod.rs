//! Resource exchange types shared with the host
//!
//! The host collects request portfolios from every agent, shows the
//! resulting requests to bidders through an [`ExchangeContext`], matches
//! bids against requests and hands the agreed [`Trade`]s back to the
//! agents involved. Matching itself happens outside this crate.

pub mod constraint;

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::composition::Material;
use crate::error::Result;
use crate::types::{AgentId, EPS_RSRC};

pub use constraint::{CapacityConstraint, Converter};

/// Request for a material on a commodity market
#[derive(Debug, Clone)]
pub struct Request {
    target: Material,
    requester: AgentId,
    commodity: String,
}

impl Request {
    /// Create a request for `target` on `commodity`
    pub fn new(target: Material, requester: AgentId, commodity: impl Into<String>) -> Self {
        Self {
            target,
            requester,
            commodity: commodity.into(),
        }
    }

    /// Requested material (quantity and composition)
    pub fn target(&self) -> &Material {
        &self.target
    }

    /// Requesting agent
    pub fn requester(&self) -> AgentId {
        self.requester
    }

    /// Commodity name
    pub fn commodity(&self) -> &str {
        &self.commodity
    }
}

/// Offer of a material in response to a request
#[derive(Debug, Clone)]
pub struct Bid {
    request: Arc<Request>,
    offer: Material,
    bidder: AgentId,
}

impl Bid {
    /// Create a bid answering `request`
    pub fn new(request: Arc<Request>, offer: Material, bidder: AgentId) -> Self {
        Self {
            request,
            offer,
            bidder,
        }
    }

    /// Request this bid answers
    pub fn request(&self) -> &Arc<Request> {
        &self.request
    }

    /// Offered material
    pub fn offer(&self) -> &Material {
        &self.offer
    }

    /// Bidding agent
    pub fn bidder(&self) -> AgentId {
        self.bidder
    }
}

/// Agreed transfer between a request and a bid
#[derive(Debug, Clone)]
pub struct Trade {
    /// Matched request
    pub request: Arc<Request>,
    /// Matched bid
    pub bid: Arc<Bid>,
    /// Agreed quantity
    pub amt: f64,
}

impl Trade {
    /// Create a trade
    pub fn new(request: Arc<Request>, bid: Arc<Bid>, amt: f64) -> Self {
        Self { request, bid, amt }
    }
}

fn push_constraint(constraints: &mut Vec<CapacityConstraint>, constraint: CapacityConstraint) {
    if !constraints.contains(&constraint) {
        constraints.push(constraint);
    }
}

/// Mutually exclusive requests sharing a set of capacity constraints
#[derive(Debug, Clone)]
pub struct RequestPortfolio {
    requester: AgentId,
    requests: Vec<Arc<Request>>,
    constraints: Vec<CapacityConstraint>,
    qty: f64,
}

impl RequestPortfolio {
    /// Create an empty portfolio for `requester`
    pub fn new(requester: AgentId) -> Self {
        Self {
            requester,
            requests: Vec::new(),
            constraints: Vec::new(),
            qty: 0.0,
        }
    }

    /// Add a request. The portfolio quantity is that of its first request.
    pub fn add_request(&mut self, target: Material, commodity: impl Into<String>) -> Arc<Request> {
        if self.requests.is_empty() {
            self.qty = target.quantity();
        }
        let request = Arc::new(Request::new(target, self.requester, commodity));
        self.requests.push(Arc::clone(&request));
        request
    }

    /// Add a constraint; duplicates are ignored
    pub fn add_constraint(&mut self, constraint: CapacityConstraint) {
        push_constraint(&mut self.constraints, constraint);
    }

    /// Requesting agent
    pub fn requester(&self) -> AgentId {
        self.requester
    }

    /// Requests in the portfolio
    pub fn requests(&self) -> &[Arc<Request>] {
        &self.requests
    }

    /// Constraints on the portfolio
    pub fn constraints(&self) -> &[CapacityConstraint] {
        &self.constraints
    }

    /// Quantity requested by the portfolio
    pub fn qty(&self) -> f64 {
        self.qty
    }
}

/// Bids from one agent sharing a set of capacity constraints
#[derive(Debug, Clone)]
pub struct BidPortfolio {
    bidder: AgentId,
    bids: Vec<Arc<Bid>>,
    constraints: Vec<CapacityConstraint>,
}

impl BidPortfolio {
    /// Create an empty portfolio for `bidder`
    pub fn new(bidder: AgentId) -> Self {
        Self {
            bidder,
            bids: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Add a bid on `request`
    pub fn add_bid(&mut self, request: Arc<Request>, offer: Material) -> Arc<Bid> {
        let bid = Arc::new(Bid::new(request, offer, self.bidder));
        self.bids.push(Arc::clone(&bid));
        bid
    }

    /// Add a constraint; duplicates are ignored
    pub fn add_constraint(&mut self, constraint: CapacityConstraint) {
        push_constraint(&mut self.constraints, constraint);
    }

    /// Bidding agent
    pub fn bidder(&self) -> AgentId {
        self.bidder
    }

    /// Bids in the portfolio
    pub fn bids(&self) -> &[Arc<Bid>] {
        &self.bids
    }

    /// Constraints on the portfolio
    pub fn constraints(&self) -> &[CapacityConstraint] {
        &self.constraints
    }

    /// Check a proposed allocation (bid, quantity) against every
    /// constraint at once
    pub fn admits(&self, allocations: &[(Arc<Bid>, f64)]) -> Result<bool> {
        for constraint in &self.constraints {
            let mut used = 0.0;
            for (bid, qty) in allocations {
                let mat = Material::new(*qty, Arc::clone(bid.offer().comp()))?;
                used += constraint.convert(&mat)?;
            }
            if used > constraint.capacity() + EPS_RSRC {
                debug!(
                    converter = constraint.converter().name(),
                    used = used,
                    capacity = constraint.capacity(),
                    "Allocation violates constraint"
                );
                return Ok(false);
            }
        }
        Ok(true)
    }
}

/// Requests visible to bidders during one exchange
#[derive(Debug, Clone, Default)]
pub struct ExchangeContext {
    requests: BTreeMap<String, Vec<Arc<Request>>>,
}

impl ExchangeContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a request
    pub fn add_request(&mut self, request: Arc<Request>) {
        self.requests
            .entry(request.commodity().to_string())
            .or_default()
            .push(request);
    }

    /// Publish every request of a portfolio
    pub fn add_request_portfolio(&mut self, portfolio: &RequestPortfolio) {
        for request in portfolio.requests() {
            self.add_request(Arc::clone(request));
        }
    }

    /// Requests published on `commodity`
    pub fn requests_for(&self, commodity: &str) -> &[Arc<Request>] {
        self.requests
            .get(commodity)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Total number of published requests
    pub fn len(&self) -> usize {
        self.requests.values().map(Vec::len).sum()
    }

    /// True when nothing has been published
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::composition::Composition;
    use crate::types::NucId;

    fn product(qty: f64, assay: f64) -> Material {
        let comp =
            Composition::from_atom([(NucId::U235, assay), (NucId::U238, 1.0 - assay)]).unwrap();
        Material::new(qty, comp).unwrap()
    }

    #[test]
    fn test_context_by_commodity() {
        let requester = AgentId::new();
        let mut ctx = ExchangeContext::new();
        ctx.add_request(Arc::new(Request::new(product(1.0, 0.05), requester, "leu")));
        ctx.add_request(Arc::new(Request::new(product(2.0, 0.05), requester, "leu")));
        ctx.add_request(Arc::new(Request::new(product(1.0, 0.9), requester, "heu")));

        assert_eq!(ctx.len(), 3);
        assert_eq!(ctx.requests_for("leu").len(), 2);
        assert_eq!(ctx.requests_for("heu").len(), 1);
        assert!(ctx.requests_for("natu").is_empty());
    }

    #[test]
    fn test_request_portfolio() {
        let requester = AgentId::new();
        let mut port = RequestPortfolio::new(requester);
        let req = port.add_request(product(5.0, 0.0072), "natu");
        port.add_constraint(CapacityConstraint::new(5.0));
        port.add_constraint(CapacityConstraint::new(5.0));

        assert_eq!(port.qty(), 5.0);
        assert_eq!(req.requester(), requester);
        assert_eq!(port.constraints().len(), 1);

        let mut ctx = ExchangeContext::new();
        ctx.add_request_portfolio(&port);
        assert_eq!(ctx.requests_for("natu").len(), 1);
    }

    #[test]
    fn test_bid_portfolio_admits() {
        let bidder = AgentId::new();
        let req = Arc::new(Request::new(product(1.0, 0.05), AgentId::new(), "leu"));
        let mut port = BidPortfolio::new(bidder);
        let bid = port.add_bid(Arc::clone(&req), product(1.0, 0.05));
        port.add_constraint(CapacityConstraint::new(1.5));

        assert_eq!(bid.bidder(), bidder);
        assert!(port.admits(&[(Arc::clone(&bid), 1.0)]).unwrap());
        assert!(!port
            .admits(&[(Arc::clone(&bid), 1.0), (Arc::clone(&bid), 1.0)])
            .unwrap());
    }
}
