// src/units.rs

// Customary units of measure. A `System` is the chain of convertible units for
// one dimension; a `Quantity` carries an exact amount in its system's base unit
// together with the units it should be shown in.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, UserError};
use crate::rat::Rational;

// --- Dimensions ---

/// Exponents of length, mass and time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub length: i32,
    pub mass: i32,
    pub time: i32,
}

impl Dimension {
    pub const fn new(length: i32, mass: i32, time: i32) -> Self {
        Dimension { length, mass, time }
    }

    pub const SCALAR: Dimension = Dimension::new(0, 0, 0);
    pub const LENGTH: Dimension = Dimension::new(1, 0, 0);
    pub const MASS: Dimension = Dimension::new(0, 1, 0);
    pub const TIME: Dimension = Dimension::new(0, 0, 1);

    pub const AREA: Dimension = Dimension::LENGTH.mul(Dimension::LENGTH);
    pub const VOLUME: Dimension = Dimension::AREA.mul(Dimension::LENGTH);
    pub const VELOCITY: Dimension = Dimension::LENGTH.div(Dimension::TIME);
    pub const ACCELERATION: Dimension = Dimension::VELOCITY.div(Dimension::TIME);
    pub const FREQUENCY: Dimension = Dimension::TIME.inv();

    pub const fn mul(self, other: Dimension) -> Dimension {
        Dimension::new(self.length + other.length, self.mass + other.mass, self.time + other.time)
    }

    pub const fn div(self, other: Dimension) -> Dimension {
        self.mul(other.inv())
    }

    pub const fn inv(self) -> Dimension {
        Dimension::new(-self.length, -self.mass, -self.time)
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = [("L", self.length), ("M", self.mass), ("T", self.time)]
            .iter()
            .filter(|(_, exp)| *exp != 0)
            .map(|(sym, exp)| if *exp == 1 { sym.to_string() } else { format!("{}^{}", sym, exp) })
            .collect();
        if parts.is_empty() {
            write!(f, "1")
        } else {
            write!(f, "{}", parts.join("·"))
        }
    }
}

// --- Systems ---

#[derive(Debug, Clone, PartialEq)]
pub struct Unit {
    pub name: String,
    /// How many base units one of this unit is.
    pub factor: Rational,
}

/// A chain of units over one dimension, each a multiple of the base unit.
///
/// Greedy change-making in `Quantity::using` only gives the expected split when
/// the chain is coherent: sorted by factor, each factor is a whole multiple of
/// the next smaller one. `is_coherent` checks this.
#[derive(Debug, Clone, PartialEq)]
pub struct System {
    pub name: String,
    pub dimension: Dimension,
    pub base: String,
    pub units: Vec<Unit>,
}

impl System {
    pub fn new(name: &str, dimension: Dimension, base: &str) -> Self {
        System {
            name: name.to_string(),
            dimension,
            base: base.to_string(),
            units: vec![Unit { name: base.to_string(), factor: Rational::from_integer(1) }],
        }
    }

    /// Adds a unit worth `factor` base units. Plain integers are promoted.
    pub fn unit(mut self, name: &str, factor: impl Into<Rational>) -> Self {
        self.units.push(Unit { name: name.to_string(), factor: factor.into() });
        self
    }

    pub fn get(&self, name: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.name == name)
    }

    pub fn is_coherent(&self) -> bool {
        let mut factors: Vec<&Rational> = self.units.iter().map(|u| &u.factor).collect();
        factors.sort_by(|a, b| b.cmp(a));
        factors.windows(2).all(|pair| {
            !pair[1].is_zero() && pair[0].div(pair[1]).map(|q| q.is_integer()).unwrap_or(false)
        })
    }
}

/// The set of systems quantities can be expressed in.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    systems: Vec<System>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, system: System) -> Self {
        self.systems.push(system);
        self
    }

    /// US customary length, volume and mass, plus time.
    pub fn customary() -> Self {
        Registry::new()
            .with(
                System::new("length", Dimension::LENGTH, "in")
                    .unit("ft", 12)
                    .unit("yd", 36)
                    .unit("mi", 63360),
            )
            .with(
                System::new("volume", Dimension::VOLUME, "tsp")
                    .unit("tbsp", 3)
                    .unit("floz", 6)
                    .unit("cup", 48)
                    .unit("pt", 96)
                    .unit("qt", 192)
                    .unit("gal", 768),
            )
            .with(System::new("mass", Dimension::MASS, "oz").unit("lb", 16).unit("ton", 32000))
            .with(
                System::new("time", Dimension::TIME, "s")
                    .unit("min", 60)
                    .unit("h", 3600)
                    .unit("day", 86400),
            )
    }

    pub fn systems(&self) -> &[System] {
        &self.systems
    }

    pub fn lookup(&self, name: &str) -> Result<(&System, &Unit)> {
        self.systems
            .iter()
            .find_map(|s| s.get(name).map(|u| (s, u)))
            .ok_or_else(|| UserError::UnknownUnit(name.to_string()))
    }
}

// --- Quantities ---

#[derive(Debug, Clone, PartialEq)]
pub struct Quantity {
    /// Amount in base units.
    pub value: Rational,
    pub dimension: Dimension,
    /// Units to display the quantity in.
    pub units: BTreeSet<String>,
}

impl Quantity {
    pub fn new(registry: &Registry, amount: impl Into<Rational>, unit: &str) -> Result<Self> {
        let (system, u) = registry.lookup(unit)?;
        Ok(Quantity {
            value: amount.into().mul(&u.factor),
            dimension: system.dimension,
            units: BTreeSet::from([unit.to_string()]),
        })
    }

    /// Expresses the quantity in `units`, largest first. Every unit but the
    /// smallest gets a whole count; the smallest absorbs the exact remainder.
    pub fn using(&self, registry: &Registry, units: &[&str]) -> Result<Vec<(String, Rational)>> {
        let mut chain = Vec::with_capacity(units.len());
        for name in units {
            let (system, unit) = registry.lookup(name)?;
            if system.dimension != self.dimension {
                return Err(UserError::IncompatUnits);
            }
            chain.push(unit);
        }
        chain.sort_by(|a, b| b.factor.cmp(&a.factor));
        Ok(change(&self.value, &chain))
    }

    /// Renders in the quantity's own display units, e.g. `1 ft 6 in`.
    pub fn render(&self, registry: &Registry) -> Result<String> {
        let names: Vec<&str> = self.units.iter().map(String::as_str).collect();
        self.render_in(registry, &names)
    }

    /// Renders in `units` regardless of the quantity's own display units.
    pub fn render_in(&self, registry: &Registry, units: &[&str]) -> Result<String> {
        Ok(self
            .using(registry, units)?
            .iter()
            .map(|(name, count)| format!("{} {}", count.to_proper(), name))
            .collect::<Vec<_>>()
            .join(" "))
    }

    pub fn add(&self, other: &Quantity) -> Result<Quantity> {
        if self.dimension != other.dimension {
            return Err(UserError::IncompatUnits);
        }
        Ok(Quantity {
            value: self.value.add(&other.value),
            dimension: self.dimension,
            units: self.units.union(&other.units).cloned().collect(),
        })
    }

    pub fn sub(&self, other: &Quantity) -> Result<Quantity> {
        self.add(&Quantity { value: other.value.neg(), ..other.clone() })
    }

    /// The combined unit set is not checked for meaning (ft·lb stays {ft, lb}).
    pub fn mul(&self, other: &Quantity) -> Quantity {
        Quantity {
            value: self.value.mul(&other.value),
            dimension: self.dimension.mul(other.dimension),
            units: self.units.union(&other.units).cloned().collect(),
        }
    }

    pub fn div(&self, other: &Quantity) -> Result<Quantity> {
        Ok(Quantity {
            value: self.value.div(&other.value)?,
            dimension: self.dimension.div(other.dimension),
            units: self.units.union(&other.units).cloned().collect(),
        })
    }
}

/// Converts `amount` of `from` into the `to` units, e.g. `18 in` into `1 ft 6 in`.
pub fn convert(
    registry: &Registry,
    amount: impl Into<Rational>,
    from: &str,
    to: &[&str],
) -> Result<String> {
    Quantity::new(registry, amount, from)?.render_in(registry, to)
}

/// Greedy change-making over a chain sorted largest first. A negative amount
/// is changed on its magnitude and every part carries the sign.
fn change(amount: &Rational, chain: &[&Unit]) -> Vec<(String, Rational)> {
    let negative = amount.is_negative();
    let mut remaining = amount.abs();
    let mut parts = Vec::with_capacity(chain.len());

    for (i, unit) in chain.iter().enumerate() {
        let count = if i + 1 == chain.len() {
            // Factors are never zero: units are only built from declared systems.
            remaining.div(&unit.factor).unwrap_or_else(|_| Rational::zero())
        } else {
            let whole = remaining
                .div(&unit.factor)
                .map(|q| q.floor())
                .unwrap_or_else(|_| Rational::zero());
            remaining = remaining.sub(&whole.mul(&unit.factor));
            whole
        };
        let count = if negative { count.neg() } else { count };
        parts.push((unit.name.clone(), count.simplify()));
    }
    parts
}
