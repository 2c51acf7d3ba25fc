//! The enrichment facility agent
//!
//! ## Table of Contents
//! - **Model**: Lifecycle capabilities every agent model provides
//! - **Trader**: Per-step material exchange operations called by the host
//! - **EnrichmentFacility**: Feed buffer + SWU-limited cascade
//!
//! Each step the host asks the facility for feed requests, shows it the
//! product requests of other agents, and hands back the trades it agreed
//! to. The facility never holds more feed than its inventory size and
//! never commits more separative work in a step than its SWU capacity.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::buffer::ResourceBuffer;
use crate::composition::{Composition, Material, RecipeBook};
use crate::config::FacilityConfig;
use crate::enrichment::{feed_qty, swu_required, uranium_assay, Assays};
use crate::error::{EnrichError, Result};
use crate::exchange::{
    BidPortfolio, CapacityConstraint, Converter, ExchangeContext, RequestPortfolio, Trade,
};
use crate::metrics::FacilityMetrics;
use crate::types::{AgentId, NucId, EPS_RSRC};

/// Lifecycle capabilities of an agent model
pub trait Model {
    /// Name of the model implementation
    fn model_impl(&self) -> &str;

    /// Human-readable description of the configured model
    fn describe(&self) -> String;

    /// A fresh instance with the same configuration and no state
    fn clone_model(&self) -> Self
    where
        Self: Sized;
}

/// Material exchange operations, called once per step by the host
pub trait Trader {
    /// Identity used on requests and bids
    fn id(&self) -> AgentId;

    /// Requests for material this step
    fn add_matl_requests(&self) -> Result<Vec<RequestPortfolio>>;

    /// Bids on the requests visible in `ctx`
    fn add_matl_bids(&self, ctx: &ExchangeContext) -> Result<Vec<BidPortfolio>>;

    /// Take delivery of materials for accepted requests
    fn accept_matl_trades(&mut self, responses: Vec<(Trade, Material)>) -> Result<()>;

    /// Produce the materials for accepted bids
    fn get_matl_trades(&mut self, trades: &[Trade]) -> Result<Vec<(Trade, Material)>>;
}

/// Product material and the cascade resources it consumes
#[derive(Debug, Clone)]
struct ProductPlan {
    product: Material,
    feed: f64,
    swu: f64,
}

/// Enrichment facility: buys natural uranium feed, sells enriched product
#[derive(Debug)]
pub struct EnrichmentFacility {
    id: AgentId,
    config: FacilityConfig,
    inventory: ResourceBuffer,
    current_swu_capacity: f64,
    tails_produced: f64,
    metrics: Option<Arc<FacilityMetrics>>,
}

impl EnrichmentFacility {
    /// Build a facility, resolving its feed recipe from `recipes`
    pub fn new(config: FacilityConfig, recipes: &RecipeBook) -> Result<Self> {
        config.validate()?;
        let recipe = recipes.get(&config.in_recipe)?;
        let id = AgentId::new();

        info!(
            facility = %id,
            in_commodity = %config.in_commodity,
            out_commodity = %config.out_commodity,
            inventory_size = config.inventory_size,
            swu_capacity = config.swu_capacity,
            "Building enrichment facility"
        );

        Ok(Self {
            id,
            inventory: ResourceBuffer::new(config.inventory_size, recipe),
            current_swu_capacity: config.swu_capacity,
            tails_produced: 0.0,
            metrics: None,
            config,
        })
    }

    /// Attach a metrics sink
    pub fn with_metrics(mut self, metrics: Arc<FacilityMetrics>) -> Self {
        metrics.set_swu_available(self.current_swu_capacity);
        metrics.inventory.set(self.inventory.quantity());
        self.metrics = Some(metrics);
        self
    }

    // ---------------------------------------------------------------------
    // Configuration
    // ---------------------------------------------------------------------

    /// Full configuration
    pub fn config(&self) -> &FacilityConfig {
        &self.config
    }

    /// Feed commodity
    pub fn in_commodity(&self) -> &str {
        &self.config.in_commodity
    }

    /// Set the feed commodity
    pub fn set_in_commodity(&mut self, commodity: impl Into<String>) {
        self.config.in_commodity = commodity.into();
    }

    /// Feed recipe name
    pub fn in_recipe(&self) -> &str {
        &self.config.in_recipe
    }

    /// Switch to another feed recipe. Only allowed while the inventory is
    /// empty, since stored feed must match the accepted recipe.
    pub fn set_in_recipe(&mut self, name: impl Into<String>, recipes: &RecipeBook) -> Result<()> {
        let name = name.into();
        let recipe = recipes.get(&name)?;
        if !self.inventory.is_empty() {
            return Err(EnrichError::config(
                "cannot change the feed recipe while inventory is held",
            ));
        }
        self.inventory = ResourceBuffer::new(self.inventory.capacity(), recipe);
        self.config.in_recipe = name;
        Ok(())
    }

    /// Product commodity
    pub fn out_commodity(&self) -> &str {
        &self.config.out_commodity
    }

    /// Set the product commodity
    pub fn set_out_commodity(&mut self, commodity: impl Into<String>) {
        self.config.out_commodity = commodity.into();
    }

    /// Tails assay
    pub fn tails_assay(&self) -> f64 {
        self.config.tails_assay
    }

    /// Set the tails assay; it must stay in (0, feed assay)
    pub fn set_tails_assay(&mut self, assay: f64) -> Result<()> {
        let config = self.config.clone().tails_assay(assay);
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Feed assay
    pub fn feed_assay(&self) -> f64 {
        self.config.feed_assay
    }

    /// Set the feed assay; it must stay in (tails assay, 1)
    pub fn set_feed_assay(&mut self, assay: f64) -> Result<()> {
        let config = self.config.clone().feed_assay(assay);
        config.validate()?;
        self.config = config;
        Ok(())
    }

    /// Separative work available per step
    pub fn swu_capacity(&self) -> f64 {
        self.config.swu_capacity
    }

    /// Set the per-step SWU capacity; also resets the SWU left this step
    pub fn set_swu_capacity(&mut self, swu: f64) -> Result<()> {
        let config = self.config.clone().swu_capacity(swu);
        config.validate()?;
        self.config = config;
        self.set_current_swu(swu);
        Ok(())
    }

    /// Separative work left in the current step
    pub fn current_swu_capacity(&self) -> f64 {
        self.current_swu_capacity
    }

    /// Product price
    pub fn commodity_price(&self) -> f64 {
        self.config.commodity_price
    }

    /// Set the product price
    pub fn set_commodity_price(&mut self, price: f64) {
        self.config.commodity_price = price;
    }

    /// Maximum feed inventory
    pub fn max_inventory_size(&self) -> f64 {
        self.inventory.capacity()
    }

    /// Set the maximum feed inventory; fails below the current inventory
    pub fn set_max_inventory_size(&mut self, size: f64) -> Result<()> {
        self.inventory.set_capacity(size)?;
        self.config.inventory_size = size;
        Ok(())
    }

    /// Feed currently held
    pub fn inventory_size(&self) -> f64 {
        self.inventory.quantity()
    }

    /// Tails produced since construction
    pub fn tails_produced(&self) -> f64 {
        self.tails_produced
    }

    // ---------------------------------------------------------------------
    // Step hooks
    // ---------------------------------------------------------------------

    /// Start of a step: the full SWU capacity becomes available again
    pub fn tick(&mut self, time: u64) {
        debug!(facility = %self.id, time = time, "Tick");
        self.set_current_swu(self.config.swu_capacity);
    }

    /// End of a step
    pub fn tock(&mut self, time: u64) {
        info!(
            facility = %self.id,
            time = time,
            inventory = self.inventory.quantity(),
            swu_used = self.config.swu_capacity - self.current_swu_capacity,
            tails = self.tails_produced,
            "Step complete"
        );
    }

    fn set_current_swu(&mut self, swu: f64) {
        self.current_swu_capacity = swu.max(0.0);
        if let Some(metrics) = &self.metrics {
            metrics.set_swu_available(self.current_swu_capacity);
        }
    }

    // ---------------------------------------------------------------------
    // Requests
    // ---------------------------------------------------------------------

    /// The feed the facility would ask for right now: its free inventory
    /// space, in the accepted recipe
    pub fn request_material(&self) -> Result<Material> {
        Material::new(self.inventory.space(), Arc::clone(self.inventory.recipe()))
    }

    fn build_requests(&self) -> Result<Vec<RequestPortfolio>> {
        let target = self.request_material()?;
        let qty = target.quantity();
        if qty <= EPS_RSRC {
            debug!(facility = %self.id, "Inventory full, no feed requested");
            return Ok(Vec::new());
        }

        let mut port = RequestPortfolio::new(self.id);
        port.add_request(target, self.config.in_commodity.clone());
        port.add_constraint(CapacityConstraint::new(qty));

        debug!(
            facility = %self.id,
            commodity = %self.config.in_commodity,
            qty = qty,
            "Requesting feed"
        );
        Ok(vec![port])
    }

    // ---------------------------------------------------------------------
    // Bids
    // ---------------------------------------------------------------------

    /// True when the facility can make `target`: it carries U-238 and its
    /// assay lies strictly between the tails assay and 1
    pub fn valid_request(&self, target: &Material) -> bool {
        uranium_assay(target.comp())
            .map(|assay| assay > self.config.tails_assay && assay < 1.0)
            .unwrap_or(false)
    }

    /// The product the facility would deliver for `target`: same quantity,
    /// keeping only the U-235 / U-238 balance of its composition
    pub fn offer(&self, target: &Material) -> Result<Material> {
        let comp = target.comp();
        let product = Composition::from_atom([
            (NucId::U235, comp.atom_frac(NucId::U235)),
            (NucId::U238, comp.atom_frac(NucId::U238)),
        ])?;
        Material::new(target.quantity(), product)
    }

    fn build_bids(&self, ctx: &ExchangeContext) -> Result<Vec<BidPortfolio>> {
        let commodity = self.config.out_commodity.as_str();
        let mut port = BidPortfolio::new(self.id);

        for request in ctx.requests_for(commodity) {
            if !self.valid_request(request.target()) {
                debug!(
                    facility = %self.id,
                    requester = %request.requester(),
                    "Skipping request the cascade cannot serve"
                );
                continue;
            }
            let offer = self.offer(request.target())?;
            port.add_bid(Arc::clone(request), offer);
        }

        if port.bids().is_empty() {
            return Ok(Vec::new());
        }

        let feed = self.config.feed_assay;
        let tails = self.config.tails_assay;
        port.add_constraint(CapacityConstraint::with_converter(
            self.config.swu_capacity,
            Converter::swu(feed, tails),
        ));
        port.add_constraint(CapacityConstraint::with_converter(
            self.inventory.quantity(),
            Converter::natu(feed, tails),
        ));

        if let Some(metrics) = &self.metrics {
            metrics.record_bids(commodity, port.bids().len());
        }
        debug!(
            facility = %self.id,
            commodity = %commodity,
            bids = port.bids().len(),
            "Bidding on product requests"
        );
        Ok(vec![port])
    }

    // ---------------------------------------------------------------------
    // Trades
    // ---------------------------------------------------------------------

    /// Store feed in the inventory
    pub fn add_mat(&mut self, mat: Material) -> Result<()> {
        let qty = mat.quantity();
        self.inventory.push(mat)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_feed(qty, self.inventory.quantity());
        }
        Ok(())
    }

    fn plan_product(&self, trade: &Trade) -> Result<ProductPlan> {
        if trade.bid.bidder() != self.id {
            warn!(
                facility = %self.id,
                bidder = %trade.bid.bidder(),
                "Refusing trade routed to the wrong facility"
            );
            return Err(EnrichError::domain(format!(
                "trade bid belongs to {}, not {}",
                trade.bid.bidder(),
                self.id
            )));
        }
        let target = Material::new(trade.amt, Arc::clone(trade.request.target().comp()))?;
        let product = self.offer(&target)?;
        let product_assay = uranium_assay(product.comp())?;
        if product_assay <= self.config.feed_assay {
            warn!(
                facility = %self.id,
                product_assay = product_assay,
                feed_assay = self.config.feed_assay,
                "Refusing trade for product no richer than the feed"
            );
            return Err(EnrichError::domain(format!(
                "product assay {} must exceed feed assay {}",
                product_assay, self.config.feed_assay
            )));
        }
        let assays = Assays::new(self.config.feed_assay, product_assay, self.config.tails_assay);
        Ok(ProductPlan {
            feed: feed_qty(trade.amt, &assays)?,
            swu: swu_required(trade.amt, &assays)?,
            product,
        })
    }

    fn execute_plan(&mut self, plan: ProductPlan) -> Result<Material> {
        if plan.swu > self.current_swu_capacity + EPS_RSRC {
            warn!(
                facility = %self.id,
                swu = plan.swu,
                available = self.current_swu_capacity,
                "Trade needs more separative work than is left this step"
            );
            return Err(EnrichError::capacity(plan.swu, self.current_swu_capacity));
        }
        self.inventory.pop_qty(plan.feed)?;

        let tails = plan.feed - plan.product.quantity();
        self.tails_produced += tails;
        self.set_current_swu(self.current_swu_capacity - plan.swu);

        if let Some(metrics) = &self.metrics {
            metrics.record_product(
                &self.config.out_commodity,
                plan.product.quantity(),
                plan.swu,
                tails,
                self.inventory.quantity(),
            );
        }
        debug!(
            facility = %self.id,
            product = plan.product.quantity(),
            feed = plan.feed,
            swu = plan.swu,
            "Enriched product"
        );
        Ok(plan.product)
    }

    /// Produce the material for one accepted bid, drawing its feed from the
    /// inventory and its separative work from this step's capacity
    pub fn respond_to_trade(&mut self, trade: &Trade) -> Result<Material> {
        let plan = self.plan_product(trade)?;
        self.execute_plan(plan)
    }
}

impl Model for EnrichmentFacility {
    fn model_impl(&self) -> &str {
        "EnrichmentFacility"
    }

    fn describe(&self) -> String {
        format!(
            "{} {} ({}), inventory: {}, swu left: {}",
            self.model_impl(),
            self.id,
            self.config.describe(),
            self.inventory.quantity(),
            self.current_swu_capacity,
        )
    }

    fn clone_model(&self) -> Self {
        Self {
            id: AgentId::new(),
            config: self.config.clone(),
            inventory: ResourceBuffer::new(
                self.inventory.capacity(),
                Arc::clone(self.inventory.recipe()),
            ),
            current_swu_capacity: self.config.swu_capacity,
            tails_produced: 0.0,
            metrics: None,
        }
    }
}

impl Trader for EnrichmentFacility {
    fn id(&self) -> AgentId {
        self.id
    }

    fn add_matl_requests(&self) -> Result<Vec<RequestPortfolio>> {
        self.build_requests()
    }

    fn add_matl_bids(&self, ctx: &ExchangeContext) -> Result<Vec<BidPortfolio>> {
        self.build_bids(ctx)
    }

    fn accept_matl_trades(&mut self, responses: Vec<(Trade, Material)>) -> Result<()> {
        let count = responses.len();
        let mats: Vec<Material> = responses.into_iter().map(|(_, mat)| mat).collect();
        let incoming: f64 = mats.iter().map(Material::quantity).sum();

        self.inventory.push_all(mats)?;
        if let Some(metrics) = &self.metrics {
            metrics.record_feed(incoming, self.inventory.quantity());
        }

        info!(
            facility = %self.id,
            trades = count,
            qty = incoming,
            inventory = self.inventory.quantity(),
            "Accepted feed trades"
        );
        Ok(())
    }

    fn get_matl_trades(&mut self, trades: &[Trade]) -> Result<Vec<(Trade, Material)>> {
        let plans = trades
            .iter()
            .map(|trade| self.plan_product(trade))
            .collect::<Result<Vec<_>>>()?;

        let feed: f64 = plans.iter().map(|p| p.feed).sum();
        let swu: f64 = plans.iter().map(|p| p.swu).sum();
        if swu > self.current_swu_capacity + EPS_RSRC {
            warn!(
                facility = %self.id,
                swu = swu,
                available = self.current_swu_capacity,
                "Trades need more separative work than is left this step"
            );
            return Err(EnrichError::capacity(swu, self.current_swu_capacity));
        }
        if feed > self.inventory.quantity() + EPS_RSRC {
            warn!(
                facility = %self.id,
                feed = feed,
                held = self.inventory.quantity(),
                "Trades need more feed than is held"
            );
            return Err(EnrichError::insufficient(feed, self.inventory.quantity()));
        }

        let mut responses = Vec::with_capacity(trades.len());
        for (trade, plan) in trades.iter().zip(plans) {
            let product = self.execute_plan(plan)?;
            responses.push((trade.clone(), product));
        }

        info!(
            facility = %self.id,
            trades = responses.len(),
            feed = feed,
            swu = swu,
            "Shipped product trades"
        );
        Ok(responses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exchange::Request;

    const IN_COMMOD: &str = "incommod";
    const OUT_COMMOD: &str = "outcommod";
    const IN_RECIPE: &str = "recipe";
    const FEED_ASSAY: f64 = 0.0072;
    const TAILS_ASSAY: f64 = 0.002;
    const SWU_CAPACITY: f64 = 100.0;
    const INV_SIZE: f64 = 5.0;

    struct Fixture {
        recipes: RecipeBook,
        facility: EnrichmentFacility,
        trader: AgentId,
    }

    impl Fixture {
        fn new() -> Self {
            let recipe = Composition::from_atom([
                (NucId::U235, FEED_ASSAY),
                (NucId::U238, 1.0 - FEED_ASSAY),
            ])
            .unwrap();
            let recipes = RecipeBook::new().with_recipe(IN_RECIPE, recipe);
            let config = FacilityConfig::new()
                .in_commodity(IN_COMMOD)
                .in_recipe(IN_RECIPE)
                .out_commodity(OUT_COMMOD)
                .tails_assay(TAILS_ASSAY)
                .feed_assay(FEED_ASSAY)
                .commodity_price(0.0)
                .inventory_size(INV_SIZE)
                .swu_capacity(SWU_CAPACITY);
            let facility = EnrichmentFacility::new(config, &recipes).unwrap();
            Self {
                recipes,
                facility,
                trader: AgentId::new(),
            }
        }

        fn feed(&self, qty: f64) -> Material {
            Material::new(qty, self.recipes.get(IN_RECIPE).unwrap()).unwrap()
        }

        fn product_request(&self, qty: f64, enr: f64) -> Arc<Request> {
            let comp =
                Composition::from_atom([(NucId::U235, enr), (NucId::U238, 1.0 - enr)]).unwrap();
            let target = Material::new(qty, comp).unwrap();
            Arc::new(Request::new(target, self.trader, OUT_COMMOD))
        }

        fn product_trade(&self, qty: f64, enr: f64) -> Trade {
            let request = self.product_request(qty, enr);
            let offer = self.facility.offer(request.target()).unwrap();
            let bid = Arc::new(crate::exchange::Bid::new(
                Arc::clone(&request),
                offer,
                self.facility.id(),
            ));
            Trade::new(request, bid, qty)
        }
    }

    fn pure_u235(qty: f64) -> Material {
        Material::new(qty, Composition::from_atom([(NucId::U235, 1.0)]).unwrap()).unwrap()
    }

    fn u_mat(qty: f64, atoms: &[(NucId, f64)]) -> Material {
        Material::new(qty, Composition::from_atom(atoms.iter().copied()).unwrap()).unwrap()
    }

    #[test]
    fn test_initial_state() {
        let fx = Fixture::new();
        let fac = &fx.facility;
        assert_eq!(fac.in_recipe(), IN_RECIPE);
        assert_eq!(fac.in_commodity(), IN_COMMOD);
        assert_eq!(fac.out_commodity(), OUT_COMMOD);
        assert_eq!(fac.tails_assay(), TAILS_ASSAY);
        assert_eq!(fac.feed_assay(), FEED_ASSAY);
        assert_eq!(fac.max_inventory_size(), INV_SIZE);
        assert_eq!(fac.commodity_price(), 0.0);
        assert_eq!(fac.inventory_size(), 0.0);
        assert_eq!(fac.swu_capacity(), SWU_CAPACITY);
        assert_eq!(fac.current_swu_capacity(), SWU_CAPACITY);
    }

    #[test]
    fn test_unknown_recipe() {
        let config = FacilityConfig::new().in_recipe("missing");
        let err = EnrichmentFacility::new(config, &RecipeBook::new()).unwrap_err();
        assert!(matches!(err, EnrichError::Config(_)));
    }

    #[test]
    fn test_clone_model() {
        let mut fx = Fixture::new();
        let feed = fx.feed(2.0);
        fx.facility.add_mat(feed).unwrap();

        let cloned = fx.facility.clone_model();
        assert_ne!(cloned.id(), fx.facility.id());
        assert_eq!(cloned.config(), fx.facility.config());
        assert_eq!(cloned.max_inventory_size(), INV_SIZE);
        assert_eq!(cloned.swu_capacity(), SWU_CAPACITY);
        assert_eq!(cloned.inventory_size(), 0.0);
        assert_eq!(cloned.model_impl(), "EnrichmentFacility");
        assert!(cloned.describe().contains(OUT_COMMOD));
    }

    #[test]
    fn test_add_mat() {
        let mut fx = Fixture::new();
        let err = fx.facility.add_mat(pure_u235(1.0)).unwrap_err();
        assert!(matches!(err, EnrichError::CompositionMismatch(_)));

        let err = fx.facility.add_mat(fx.feed(INV_SIZE + 1.0)).unwrap_err();
        assert!(matches!(err, EnrichError::CapacityExceeded { .. }));

        fx.facility.add_mat(fx.feed(INV_SIZE)).unwrap();

        let err = fx.facility.add_mat(fx.feed(1.0)).unwrap_err();
        assert!(matches!(err, EnrichError::CapacityExceeded { .. }));
    }

    #[test]
    fn test_request() {
        let mut fx = Fixture::new();
        let recipe = fx.recipes.get(IN_RECIPE).unwrap();

        let mat = fx.facility.request_material().unwrap();
        assert_eq!(mat.quantity(), INV_SIZE);
        assert!(Arc::ptr_eq(mat.comp(), &recipe));

        let add = 2.0 * INV_SIZE / 3.0;
        let feed = fx.feed(add);
        fx.facility.add_mat(feed).unwrap();
        let mat = fx.facility.request_material().unwrap();
        assert!((mat.quantity() - (INV_SIZE - add)).abs() < 1e-12);
        assert!(Arc::ptr_eq(mat.comp(), &recipe));

        let feed = fx.feed(INV_SIZE / 3.0);
        fx.facility.add_mat(feed).unwrap();
        let mat = fx.facility.request_material().unwrap();
        assert!(mat.quantity().abs() < EPS_RSRC);
        assert!(fx.facility.add_matl_requests().unwrap().is_empty());
    }

    #[test]
    fn test_request_portfolio_sizing() {
        let mut fx = Fixture::new();
        let ports = fx.facility.add_matl_requests().unwrap();
        assert_eq!(ports[0].qty(), 5.0);

        let feed = fx.feed(10.0 / 3.0);
        fx.facility.add_mat(feed).unwrap();
        let ports = fx.facility.add_matl_requests().unwrap();
        assert_eq!(ports.len(), 1);
        assert!((ports[0].qty() - 5.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_offer() {
        let fx = Fixture::new();
        let qty = 4.5;
        let (u234, u235, u238) = (1.0, 1.0, 2.0);
        let mat = fx
            .facility
            .offer(&u_mat(
                qty,
                &[(NucId::U234, u234), (NucId::U235, u235), (NucId::U238, u238)],
            ))
            .unwrap();

        assert_eq!(mat.comp().atom_frac(NucId::U234), 0.0);
        assert!((mat.comp().atom_frac(NucId::U235) - u235 / (u235 + u238)).abs() < 1e-12);
        assert!((mat.comp().atom_frac(NucId::U238) - u238 / (u235 + u238)).abs() < 1e-12);
        assert_eq!(mat.quantity(), qty);
    }

    #[test]
    fn test_valid_request() {
        let mut fx = Fixture::new();
        let qty = 4.5;

        // no U-238
        assert!(!fx.facility.valid_request(&pure_u235(qty)));

        // assay equal to tails
        let at_tails = u_mat(qty, &[(NucId::U235, 0.003), (NucId::U238, 0.997)]);
        let tails = uranium_assay(at_tails.comp()).unwrap();
        fx.facility.set_tails_assay(tails).unwrap();
        assert!(!fx.facility.valid_request(&at_tails));

        // below tails
        let below = u_mat(qty, &[(NucId::U235, 0.001), (NucId::U238, 0.999)]);
        assert!(!fx.facility.valid_request(&below));

        let valid = u_mat(qty, &[(NucId::U235, 1.0), (NucId::U238, 1.0)]);
        assert!(fx.facility.valid_request(&valid));
    }

    #[test]
    fn test_empty_requests() {
        let mut fx = Fixture::new();
        let current = fx.facility.inventory_size();
        fx.facility.set_max_inventory_size(current).unwrap();

        let ports = fx.facility.add_matl_requests().unwrap();
        assert!(ports.is_empty());
        let ports = fx.facility.add_matl_requests().unwrap();
        assert!(ports.is_empty());
    }

    #[test]
    fn test_empty_requests_when_filled() {
        let mut fx = Fixture::new();
        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();

        assert!(fx.facility.add_matl_requests().unwrap().is_empty());
        assert!(fx.facility.add_matl_requests().unwrap().is_empty());
    }

    #[test]
    fn test_add_requests() {
        let fx = Fixture::new();
        let ports = fx.facility.add_matl_requests().unwrap();

        assert_eq!(ports.len(), 1);
        assert_eq!(ports[0].qty(), INV_SIZE);

        let requests = ports[0].requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].requester(), fx.facility.id());
        assert_eq!(requests[0].commodity(), IN_COMMOD);

        let constraints = ports[0].constraints();
        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0], CapacityConstraint::new(INV_SIZE));
    }

    #[test]
    fn test_accept() {
        let mut fx = Fixture::new();
        let qty = INV_SIZE / 3.0;
        let supplier = AgentId::new();

        let mut responses = Vec::new();
        for _ in 0..2 {
            let port = fx.facility.add_matl_requests().unwrap().remove(0);
            let request = Arc::clone(&port.requests()[0]);
            let bid = Arc::new(crate::exchange::Bid::new(
                Arc::clone(&request),
                fx.feed(qty),
                supplier,
            ));
            responses.push((Trade::new(request, bid, qty), fx.feed(qty)));
        }

        assert_eq!(fx.facility.inventory_size(), 0.0);
        fx.facility.accept_matl_trades(responses).unwrap();
        assert!((fx.facility.inventory_size() - 2.0 * qty).abs() < 1e-12);
    }

    #[test]
    fn test_accept_overflow_is_atomic() {
        let mut fx = Fixture::new();
        let port = fx.facility.add_matl_requests().unwrap().remove(0);
        let request = Arc::clone(&port.requests()[0]);
        let bid = Arc::new(crate::exchange::Bid::new(
            Arc::clone(&request),
            fx.feed(3.0),
            AgentId::new(),
        ));
        let responses = vec![
            (Trade::new(Arc::clone(&request), Arc::clone(&bid), 3.0), fx.feed(3.0)),
            (Trade::new(request, bid, 3.0), fx.feed(3.0)),
        ];

        let err = fx.facility.accept_matl_trades(responses).unwrap_err();
        assert!(matches!(err, EnrichError::CapacityExceeded { .. }));
        assert_eq!(fx.facility.inventory_size(), 0.0);
    }

    #[test]
    fn test_add_bids() {
        let mut fx = Fixture::new();
        let nreqs = 5;
        let nvalid = 4;

        let current_size = INV_SIZE / 2.0;
        let feed = fx.feed(current_size);
        fx.facility.add_mat(feed).unwrap();

        let mut ctx = ExchangeContext::new();
        for _ in 0..nvalid {
            ctx.add_request(fx.product_request(1.0, 0.05));
        }
        for _ in 0..(nreqs - nvalid) {
            ctx.add_request(Arc::new(Request::new(pure_u235(1.0), fx.trader, OUT_COMMOD)));
        }

        let ports = fx.facility.add_matl_bids(&ctx).unwrap();
        assert_eq!(ports.len(), 1);

        let port = &ports[0];
        assert_eq!(port.bidder(), fx.facility.id());
        assert_eq!(port.bids().len(), nvalid);

        let swu = CapacityConstraint::with_converter(
            SWU_CAPACITY,
            Converter::swu(FEED_ASSAY, TAILS_ASSAY),
        );
        let natu = CapacityConstraint::with_converter(
            current_size,
            Converter::natu(FEED_ASSAY, TAILS_ASSAY),
        );
        let constrs = port.constraints();
        assert_eq!(constrs.len(), 2);
        assert!(constrs.contains(&swu));
        assert!(constrs.contains(&natu));
    }

    #[test]
    fn test_add_bids_no_valid_requests() {
        let fx = Fixture::new();
        let mut ctx = ExchangeContext::new();
        ctx.add_request(Arc::new(Request::new(pure_u235(1.0), fx.trader, OUT_COMMOD)));
        // right assay, wrong commodity
        let comp =
            Composition::from_atom([(NucId::U235, 0.05), (NucId::U238, 0.95)]).unwrap();
        ctx.add_request(Arc::new(Request::new(
            Material::new(1.0, comp).unwrap(),
            fx.trader,
            "other",
        )));

        assert!(fx.facility.add_matl_bids(&ctx).unwrap().is_empty());
        assert!(fx.facility.add_matl_bids(&ExchangeContext::new()).unwrap().is_empty());
    }

    #[test]
    fn test_bid_portfolio_joint_constraints() {
        let mut fx = Fixture::new();
        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();

        let mut ctx = ExchangeContext::new();
        ctx.add_request(fx.product_request(1.0, 0.05));
        ctx.add_request(fx.product_request(1.0, 0.05));
        let port = fx.facility.add_matl_bids(&ctx).unwrap().remove(0);
        let bids = port.bids();

        // 0.25 kg at 5% needs ~2.3 kg of feed each: two fit, three do not
        let alloc = |n: usize| -> Vec<(Arc<crate::exchange::Bid>, f64)> {
            (0..n).map(|i| (Arc::clone(&bids[i % 2]), 0.25)).collect()
        };
        assert!(port.admits(&alloc(2)).unwrap());
        assert!(!port.admits(&alloc(3)).unwrap());
    }

    #[test]
    fn test_respond_to_trade() {
        let mut fx = Fixture::new();
        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();

        let qty = 0.1;
        let trade = fx.product_trade(qty, 0.05);
        let product = fx.facility.respond_to_trade(&trade).unwrap();

        let assays = Assays::new(FEED_ASSAY, 0.05, TAILS_ASSAY);
        let feed_used = feed_qty(qty, &assays).unwrap();
        let swu_used = swu_required(qty, &assays).unwrap();

        assert_eq!(product.quantity(), qty);
        assert!((uranium_assay(product.comp()).unwrap() - 0.05).abs() < 1e-9);
        assert!((fx.facility.inventory_size() - (INV_SIZE - feed_used)).abs() < 1e-9);
        assert!((fx.facility.current_swu_capacity() - (SWU_CAPACITY - swu_used)).abs() < 1e-9);
        assert!((fx.facility.tails_produced() - (feed_used - qty)).abs() < 1e-9);
    }

    #[test]
    fn test_respond_product_below_feed_assay() {
        let mut fx = Fixture::new();
        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();

        // 0.5% lies between tails and feed: a valid request, but not producible
        let mut ctx = ExchangeContext::new();
        ctx.add_request(fx.product_request(1.0, 0.005));
        let port = fx.facility.add_matl_bids(&ctx).unwrap().remove(0);
        let bid = Arc::clone(&port.bids()[0]);
        let trade = Trade::new(Arc::clone(bid.request()), bid, 1.0);

        let err = fx.facility.respond_to_trade(&trade).unwrap_err();
        assert!(matches!(err, EnrichError::Domain(_)));
        let err = fx.facility.get_matl_trades(&[trade]).unwrap_err();
        assert!(matches!(err, EnrichError::Domain(_)));

        assert_eq!(fx.facility.current_swu_capacity(), SWU_CAPACITY);
        assert_eq!(fx.facility.inventory_size(), INV_SIZE);
        assert_eq!(fx.facility.tails_produced(), 0.0);
    }

    #[test]
    fn test_respond_rejects_foreign_bid() {
        let mut fx = Fixture::new();
        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();

        let request = fx.product_request(0.1, 0.05);
        let offer = fx.facility.offer(request.target()).unwrap();
        let bid = Arc::new(crate::exchange::Bid::new(
            Arc::clone(&request),
            offer,
            AgentId::new(),
        ));
        let trade = Trade::new(request, bid, 0.1);

        let err = fx.facility.respond_to_trade(&trade).unwrap_err();
        assert!(matches!(err, EnrichError::Domain(_)));
        assert_eq!(fx.facility.inventory_size(), INV_SIZE);
    }

    #[test]
    fn test_respond_insufficient_feed() {
        let mut fx = Fixture::new();
        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();

        // 1 kg at 5% needs ~9.2 kg of feed
        let trade = fx.product_trade(1.0, 0.05);
        let err = fx.facility.respond_to_trade(&trade).unwrap_err();
        assert!(matches!(err, EnrichError::InsufficientInventory { .. }));
        assert_eq!(fx.facility.inventory_size(), INV_SIZE);
        assert_eq!(fx.facility.current_swu_capacity(), SWU_CAPACITY);
    }

    #[test]
    fn test_get_matl_trades_swu_limit_and_tick() {
        let mut fx = Fixture::new();
        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();

        let trade = fx.product_trade(0.1, 0.05);
        let swu = swu_required(0.1, &Assays::new(FEED_ASSAY, 0.05, TAILS_ASSAY)).unwrap();
        fx.facility.set_swu_capacity(1.5 * swu).unwrap();

        let err = fx
            .facility
            .get_matl_trades(&[trade.clone(), trade.clone()])
            .unwrap_err();
        assert!(matches!(err, EnrichError::CapacityExceeded { .. }));
        assert_eq!(fx.facility.inventory_size(), INV_SIZE);

        let responses = fx.facility.get_matl_trades(&[trade.clone()]).unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].1.quantity(), 0.1);
        assert!(fx.facility.respond_to_trade(&trade).is_err());

        fx.facility.tick(1);
        assert_eq!(fx.facility.current_swu_capacity(), 1.5 * swu);
        fx.facility.respond_to_trade(&trade).unwrap();
        fx.facility.tock(1);
    }

    #[test]
    fn test_setters() {
        let mut fx = Fixture::new();
        assert!(fx.facility.set_tails_assay(FEED_ASSAY).is_err());
        fx.facility.set_tails_assay(0.003).unwrap();
        assert_eq!(fx.facility.tails_assay(), 0.003);

        fx.facility.set_out_commodity("leu");
        assert_eq!(fx.facility.out_commodity(), "leu");

        let feed = fx.feed(1.0);
        fx.facility.add_mat(feed).unwrap();
        assert!(fx.facility.set_max_inventory_size(0.5).is_err());
        assert!(fx.facility.set_in_recipe(IN_RECIPE, &fx.recipes).is_err());
    }

    #[test]
    fn test_metrics_wiring() {
        let metrics = Arc::new(FacilityMetrics::new().unwrap());
        let mut fx = Fixture::new();
        fx.facility = fx.facility.with_metrics(Arc::clone(&metrics));

        let feed = fx.feed(INV_SIZE);
        fx.facility.add_mat(feed).unwrap();
        let trade = fx.product_trade(0.1, 0.05);
        fx.facility.get_matl_trades(&[trade]).unwrap();

        let text = metrics.gather_text().unwrap();
        assert!(text.contains("enrich_feed_accepted_kg_total 5"));
        assert!(text.contains("enrich_product_shipped_kg_total{commodity=\"outcommod\"} 0.1"));
    }
}
