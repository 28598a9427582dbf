use crate::sink::LayoutSink;
use art_common::db::indices::LayerId;
use art_common::error::ArtError;
use art_common::geom::rect::Rect;
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ObstructionMode {
    Soft,
    Hard,
    Route,
}

impl ObstructionMode {
    pub fn wants_placement(&self) -> bool {
        matches!(self, ObstructionMode::Soft | ObstructionMode::Hard)
    }
}

impl FromStr for ObstructionMode {
    type Err = ArtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "soft" => Ok(ObstructionMode::Soft),
            "hard" => Ok(ObstructionMode::Hard),
            "route" => Ok(ObstructionMode::Route),
            _ => Err(ArtError::InvalidParameter {
                name: "mode",
                value: s.to_string(),
                reason: "expected one of soft, hard, route".to_string(),
            }),
        }
    }
}

impl fmt::Display for ObstructionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObstructionMode::Soft => "soft",
            ObstructionMode::Hard => "hard",
            ObstructionMode::Route => "route",
        };
        f.write_str(name)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ObstructionKind {
    SoftBlockage,
    HardBlockage,
    RoutingObstruction(String),
}

impl ObstructionKind {
    pub fn is_placement(&self) -> bool {
        !matches!(self, ObstructionKind::RoutingObstruction(_))
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ObstructionRequest {
    pub rect: Rect,
    pub kind: ObstructionKind,
}

/// Splits comma/semicolon separated entries, trims them and drops empty
/// and repeated names, keeping the first occurrence.
pub fn normalize_layers<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut layers: Vec<String> = Vec::new();
    for entry in names {
        for part in entry.as_ref().split([',', ';']) {
            let part = part.trim();
            if !part.is_empty() && !layers.iter().any(|l| l == part) {
                layers.push(part.to_string());
            }
        }
    }
    layers
}

/// What to emit for every selected cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmitPolicy {
    pub mode: ObstructionMode,
    pub layers: Vec<String>,
}

impl EmitPolicy {
    pub fn new<I, S>(mode: ObstructionMode, layers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            mode,
            layers: normalize_layers(layers),
        }
    }

    pub fn wants_placement(&self) -> bool {
        self.mode.wants_placement()
    }

    /// Explicit layers request routing obstructions in every mode.
    pub fn wants_routing(&self) -> bool {
        self.mode == ObstructionMode::Route || !self.layers.is_empty()
    }

    pub fn requests_for(&self, rect: Rect) -> Vec<ObstructionRequest> {
        let mut requests = Vec::with_capacity(1 + self.layers.len());
        match self.mode {
            ObstructionMode::Soft => requests.push(ObstructionRequest {
                rect,
                kind: ObstructionKind::SoftBlockage,
            }),
            ObstructionMode::Hard => requests.push(ObstructionRequest {
                rect,
                kind: ObstructionKind::HardBlockage,
            }),
            ObstructionMode::Route => {}
        }
        if self.wants_routing() {
            requests.extend(self.layers.iter().map(|layer| ObstructionRequest {
                rect,
                kind: ObstructionKind::RoutingObstruction(layer.clone()),
            }));
        }
        requests
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EmitStats {
    /// Selected cells handed to the emitter.
    pub cells: usize,
    /// Cells that received at least one placement blockage.
    pub placed: usize,
    pub blockages: usize,
    pub obstructions: usize,
}

/// Turns selected cells into blockage and obstruction calls on a sink.
/// All layer names are resolved when the emitter is built, so an unknown
/// layer fails the run before anything is created.
pub struct Emitter<'a, S: LayoutSink> {
    sink: &'a mut S,
    policy: EmitPolicy,
    layers: Vec<(String, LayerId)>,
    softness: bool,
    max_density: bool,
    stats: EmitStats,
}

impl<'a, S: LayoutSink> Emitter<'a, S> {
    pub fn new(sink: &'a mut S, policy: EmitPolicy) -> Result<Self, ArtError> {
        let mut layers = Vec::with_capacity(policy.layers.len());
        for name in &policy.layers {
            let id = sink
                .find_layer(name)
                .ok_or_else(|| ArtError::UnknownLayer { name: name.clone() })?;
            layers.push((name.clone(), id));
        }

        let softness = sink.supports_softness();
        let max_density = sink.supports_max_density();
        match policy.mode {
            ObstructionMode::Soft if !softness => log::warn!(
                "Database cannot mark blockages soft; soft mode will create hard blockages"
            ),
            ObstructionMode::Hard if !max_density => log::warn!(
                "Database has no max-density setting; hard blockages rely on their default"
            ),
            ObstructionMode::Route if layers.is_empty() => {
                log::warn!("Route mode without route layers: no obstructions will be created")
            }
            _ => {}
        }

        Ok(Self {
            sink,
            policy,
            layers,
            softness,
            max_density,
            stats: EmitStats::default(),
        })
    }

    pub fn policy(&self) -> &EmitPolicy {
        &self.policy
    }

    pub fn stats(&self) -> EmitStats {
        self.stats
    }

    pub fn emit(&mut self, rect: Rect) -> Result<Vec<ObstructionRequest>, ArtError> {
        let requests = self.policy.requests_for(rect);
        let mut placed = false;
        for request in &requests {
            self.dispatch(request)?;
            placed |= request.kind.is_placement();
        }
        self.stats.cells += 1;
        if placed {
            self.stats.placed += 1;
        }
        Ok(requests)
    }

    fn dispatch(&mut self, request: &ObstructionRequest) -> Result<(), ArtError> {
        match &request.kind {
            ObstructionKind::SoftBlockage => {
                let id = self.sink.create_placement_blockage(request.rect)?;
                if self.softness {
                    self.sink.set_soft(id, true);
                }
                self.stats.blockages += 1;
            }
            ObstructionKind::HardBlockage => {
                let id = self.sink.create_placement_blockage(request.rect)?;
                if self.softness {
                    self.sink.set_soft(id, false);
                }
                if self.max_density {
                    self.sink.set_max_density(id, 0.0);
                }
                self.stats.blockages += 1;
            }
            ObstructionKind::RoutingObstruction(name) => {
                let layer = self
                    .layers
                    .iter()
                    .find(|(n, _)| n == name)
                    .map(|&(_, id)| id)
                    .ok_or_else(|| ArtError::UnknownLayer { name: name.clone() })?;
                self.sink
                    .create_routing_obstruction(layer, request.rect)
                    .map_err(|e| match e {
                        ArtError::ObstructionFailed { message, .. } => {
                            ArtError::ObstructionFailed {
                                layer: name.clone(),
                                message,
                            }
                        }
                        other => ArtError::ObstructionFailed {
                            layer: name.clone(),
                            message: other.to_string(),
                        },
                    })?;
                self.stats.obstructions += 1;
            }
        }
        Ok(())
    }
}
