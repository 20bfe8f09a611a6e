//! The region selector: configuration, dispatch, and failure isolation.

use std::fmt;
use std::str::FromStr;

use crate::context::RegionContext;
use crate::convert::region_from_tracelet;
use crate::region::Region;
use crate::strategy::{RegionStrategy, SelectError, SingleInstruction, WholeMethod};
use crate::tracelet::Tracelet;
use crate::CHECK_INVARIANTS;

/// Which strategy the selector runs.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum RegionMode {
    /// Region compilation is off.
    #[default]
    None,
    /// One instruction per region.
    OneBc,
    /// Whole functions, from their entry.
    Method,
    /// Recorded traces.
    Tracelet,
}

impl RegionMode {
    /// The configuration string selecting this mode.
    pub fn setting(self) -> &'static str {
        match self {
            RegionMode::None => "",
            RegionMode::OneBc => "onebc",
            RegionMode::Method => "method",
            RegionMode::Tracelet => "tracelet",
        }
    }
}

impl fmt::Display for RegionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionMode::None => f.write_str("none"),
            mode => f.write_str(mode.setting()),
        }
    }
}

/// A configuration string that names no region mode.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownRegionMode(pub String);

impl fmt::Display for UnknownRegionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown region mode `{}`", self.0)
    }
}

impl std::error::Error for UnknownRegionMode {}

impl FromStr for RegionMode {
    type Err = UnknownRegionMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Ok(RegionMode::None),
            "onebc" => Ok(RegionMode::OneBc),
            "method" => Ok(RegionMode::Method),
            "tracelet" => Ok(RegionMode::Tracelet),
            other => Err(UnknownRegionMode(other.to_owned())),
        }
    }
}

/// Selector configuration. Fixed for the lifetime of a selector.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SelectorConfig {
    mode: RegionMode,
}

impl SelectorConfig {
    /// Environment variable read by [`from_env`](Self::from_env).
    pub const ENV_VAR: &'static str = "KESTREL_REGION_SELECTOR";

    pub fn new(mode: RegionMode) -> Self {
        SelectorConfig { mode }
    }

    /// Parse a mode setting.
    ///
    /// An unknown setting is a misconfiguration: it panics when
    /// [`CHECK_INVARIANTS`] is set and otherwise disables region
    /// compilation.
    pub fn from_setting(setting: &str) -> Self {
        match setting.parse() {
            Ok(mode) => SelectorConfig::new(mode),
            Err(err) => {
                tracing::warn!(%err, "region compilation disabled");
                if CHECK_INVARIANTS {
                    panic!("{err}");
                }
                SelectorConfig::new(RegionMode::None)
            }
        }
    }

    /// Read the mode from [`ENV_VAR`](Self::ENV_VAR). Unset means
    /// [`RegionMode::None`].
    pub fn from_env() -> Self {
        let setting = std::env::var(Self::ENV_VAR).unwrap_or_default();
        SelectorConfig::from_setting(&setting)
    }

    #[inline]
    pub fn mode(self) -> RegionMode {
        self.mode
    }
}

/// Why no region was selected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoRegion {
    /// The configured mode is [`RegionMode::None`].
    Disabled,
    /// The strategy gave up.
    Failed(SelectError),
}

impl fmt::Display for NoRegion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoRegion::Disabled => f.write_str("region compilation disabled"),
            NoRegion::Failed(err) => write!(f, "region selection failed: {err}"),
        }
    }
}

/// Outcome of [`RegionSelector::select_region`].
#[derive(Clone, Debug)]
pub enum Selection {
    Region(Region),
    NoRegion(NoRegion),
}

impl Selection {
    #[inline]
    pub fn is_region(&self) -> bool {
        matches!(self, Selection::Region(_))
    }

    pub fn region(&self) -> Option<&Region> {
        match self {
            Selection::Region(region) => Some(region),
            Selection::NoRegion(_) => None,
        }
    }

    pub fn into_region(self) -> Option<Region> {
        match self {
            Selection::Region(region) => Some(region),
            Selection::NoRegion(_) => None,
        }
    }
}

/// Picks a region for a context according to the configured mode.
///
/// Immutable after construction and shareable across compiler threads.
pub struct RegionSelector {
    config: SelectorConfig,
    one_bc: Box<dyn RegionStrategy>,
    method: Box<dyn RegionStrategy>,
}

impl RegionSelector {
    /// A selector using the built-in strategies.
    pub fn new(config: SelectorConfig) -> Self {
        RegionSelector::with_strategies(
            config,
            Box::new(SingleInstruction),
            Box::new(WholeMethod),
        )
    }

    /// A selector using the given strategies for the
    /// [`OneBc`](RegionMode::OneBc) and [`Method`](RegionMode::Method) modes.
    pub fn with_strategies(
        config: SelectorConfig,
        one_bc: Box<dyn RegionStrategy>,
        method: Box<dyn RegionStrategy>,
    ) -> Self {
        RegionSelector {
            config,
            one_bc,
            method,
        }
    }

    #[inline]
    pub fn config(&self) -> SelectorConfig {
        self.config
    }

    /// Select a region for `ctx`.
    ///
    /// Strategy failures are reported as [`NoRegion::Failed`] and never
    /// propagate. The returned region, if any, has been re-checked.
    ///
    /// # Panics
    ///
    /// In [`RegionMode::Tracelet`] when `tracelet` is `None`.
    pub fn select_region(&self, ctx: &RegionContext, tracelet: Option<&Tracelet>) -> Selection {
        let mode = self.config.mode;
        tracing::debug!(
            func = ctx.func.name(),
            offset = %ctx.offset,
            %mode,
            "selecting region"
        );
        for live in &ctx.live_types {
            tracing::trace!(%live, "live type");
        }
        for ar in &ctx.pre_live_ars {
            tracing::trace!(%ar, "pre-live activation record");
        }

        let result = match mode {
            RegionMode::None => {
                tracing::debug!("no region selectable; using baseline compiler");
                return Selection::NoRegion(NoRegion::Disabled);
            }
            RegionMode::OneBc => run_strategy(self.one_bc.as_ref(), ctx),
            RegionMode::Method => run_strategy(self.method.as_ref(), ctx),
            RegionMode::Tracelet => {
                let Some(tlet) = tracelet else {
                    panic!("tracelet region mode requires a tracelet");
                };
                region_from_tracelet(tlet)
            }
        };

        match result {
            Ok(region) => {
                region.check_invariants();
                tracing::trace!("selected region:\n{region}");
                Selection::Region(region)
            }
            Err(err) => {
                tracing::debug!(%err, "region selector failed");
                tracing::debug!("no region selectable; using baseline compiler");
                Selection::NoRegion(NoRegion::Failed(err))
            }
        }
    }
}

fn run_strategy(strategy: &dyn RegionStrategy, ctx: &RegionContext) -> Result<Region, SelectError> {
    tracing::trace!(strategy = strategy.name(), "running region strategy");
    strategy.select(ctx)
}

impl fmt::Debug for RegionSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegionSelector")
            .field("config", &self.config)
            .field("one_bc", &self.one_bc.name())
            .field("method", &self.method.name())
            .finish()
    }
}
