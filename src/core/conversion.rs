//! Type conversion graph.
//!
//! Nodes are [`ValueKind`]s and edges are registered [`Converter`]s with a
//! priority (cost). The graph is filled once at startup and then only read,
//! so lookups need no locking.

use crate::{
    core::value::{Value, ValueKind},
    errors::{Error, Result},
};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use bigdecimal::num_bigint::BigInt;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error};

/// Converts a value of one kind into another.
///
/// Converters may be asynchronous (resolving a user mention hits the
/// platform), and may fail when the input is malformed.
#[async_trait]
pub trait Converter: Send + Sync {
    /// Performs the conversion.
    async fn convert(&self, value: Value) -> Result<Value>;
}

/// Adapts a plain function into a [`Converter`].
pub struct FnConverter<F>(pub F);

#[async_trait]
impl<F> Converter for FnConverter<F>
where
    F: Fn(Value) -> Result<Value> + Send + Sync,
{
    async fn convert(&self, value: Value) -> Result<Value> {
        (self.0)(value)
    }
}

#[derive(Clone)]
struct Edge {
    converter: Arc<dyn Converter>,
    priority: u32,
}

/// One hop of a [`ConversionPath`].
#[derive(Clone)]
pub struct Hop {
    /// Kind consumed by this hop
    pub from: ValueKind,
    /// Kind produced by this hop
    pub to: ValueKind,
    /// Cost of taking this hop
    pub priority: u32,
    converter: Arc<dyn Converter>,
}

impl fmt::Debug for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hop")
            .field("from", &self.from)
            .field("to", &self.to)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

/// Ordered chain of converters connecting two kinds. Empty when the kinds
/// already match.
#[derive(Debug, Clone, Default)]
pub struct ConversionPath {
    hops: Vec<Hop>,
}

impl ConversionPath {
    /// The hops in application order.
    #[must_use]
    pub fn hops(&self) -> &[Hop] {
        &self.hops
    }

    /// Number of converters in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.hops.len()
    }

    /// True when no conversion is needed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.hops.is_empty()
    }

    /// Sum of the priorities of every hop.
    #[must_use]
    pub fn cost(&self) -> u32 {
        self.hops.iter().map(|hop| hop.priority).sum()
    }

    /// Runs every converter in order, feeding each output into the next.
    pub async fn apply(&self, value: Value) -> Result<Value> {
        let mut current = value;
        for hop in &self.hops {
            current = hop.converter.convert(current).await?;
        }
        Ok(current)
    }
}

/// Directed graph of converters keyed by `(from, to)` kind pairs.
///
/// At most one converter exists per ordered pair: registering the same pair
/// again replaces the earlier edge.
#[derive(Clone, Default)]
pub struct ConversionGraph {
    edges: BTreeMap<ValueKind, BTreeMap<ValueKind, Edge>>,
}

impl fmt::Debug for ConversionGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let pairs: Vec<_> = self
            .edges
            .iter()
            .flat_map(|(from, targets)| {
                targets
                    .iter()
                    .map(move |(to, edge)| (*from, *to, edge.priority))
            })
            .collect();
        f.debug_struct("ConversionGraph")
            .field("edges", &pairs)
            .finish()
    }
}

impl ConversionGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a graph holding the primitive numeric widenings.
    #[must_use]
    pub fn with_primitives() -> Self {
        let mut graph = Self::new();
        add_primitive_converters(&mut graph);
        graph
    }

    /// Registers a directed edge, replacing any converter already registered
    /// for the same pair.
    pub fn add_converter(
        &mut self,
        from: ValueKind,
        to: ValueKind,
        converter: Arc<dyn Converter>,
        priority: u32,
    ) {
        let previous = self
            .edges
            .entry(from)
            .or_default()
            .insert(to, Edge {
                converter,
                priority,
            });

        if previous.is_some() {
            debug!("Replaced converter {} -> {}", from, to);
        }
    }

    /// Registers a synchronous conversion function.
    pub fn add_fn<F>(&mut self, from: ValueKind, to: ValueKind, priority: u32, convert: F)
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.add_converter(from, to, Arc::new(FnConverter(convert)), priority);
    }

    /// True when a direct edge is registered for the pair.
    #[must_use]
    pub fn has_edge(&self, from: ValueKind, to: ValueKind) -> bool {
        self.edges
            .get(&from)
            .is_some_and(|targets| targets.contains_key(&to))
    }

    /// Finds a chain of converters from `from` to `to`.
    ///
    /// Returns `Ok(None)` when `to` is unreachable. Successors are visited in
    /// [`ValueKind`] order, so the result is stable for a given graph.
    ///
    /// # Errors
    /// Returns [`Error::BrokenConversionPath`] if the reconstructed path
    /// references an edge that is not registered.
    pub fn find_path(&self, from: ValueKind, to: ValueKind) -> Result<Option<ConversionPath>> {
        let mut queue = VecDeque::from([from]);
        let mut visited = BTreeSet::from([from]);
        let mut previous: BTreeMap<ValueKind, ValueKind> = BTreeMap::new();
        let mut found = false;

        while let Some(node) = queue.pop_front() {
            if node == to {
                found = true;
                break;
            }

            let Some(targets) = self.edges.get(&node) else {
                continue;
            };

            for &next in targets.keys() {
                if visited.insert(next) {
                    previous.insert(next, node);
                    queue.push_back(next);
                }
            }
        }

        if !found {
            return Ok(None);
        }

        let mut kinds = vec![to];
        let mut current = to;
        while let Some(&prior) = previous.get(&current) {
            kinds.push(prior);
            current = prior;
        }
        kinds.reverse();

        let hops = kinds
            .windows(2)
            .map(|pair| {
                let (a, b) = (pair[0], pair[1]);
                let edge = self.edges.get(&a).and_then(|targets| targets.get(&b));
                edge.map(|edge| Hop {
                    from: a,
                    to: b,
                    priority: edge.priority,
                    converter: Arc::clone(&edge.converter),
                })
                .ok_or_else(|| {
                    error!("Conversion {} -> {} found by path search is not registered", a, b);
                    Error::BrokenConversionPath { from: a, to: b }
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(ConversionPath { hops }))
    }
}

// Ascending width; each kind widens to every later kind in its list.
const FIXED_KINDS: [ValueKind; 5] = [
    ValueKind::Byte,
    ValueKind::Short,
    ValueKind::Int,
    ValueKind::Long,
    ValueKind::BigInt,
];

const FLOATING_KINDS: [ValueKind; 3] = [
    ValueKind::Float,
    ValueKind::Double,
    ValueKind::BigDecimal,
];

/// Registers the zero-cost numeric widenings, plus `BigInt -> BigDecimal`
/// which bridges integers into decimals.
pub fn add_primitive_converters(graph: &mut ConversionGraph) {
    for kinds in [&FIXED_KINDS[..], &FLOATING_KINDS[..]] {
        for (i, &from) in kinds.iter().enumerate() {
            for &to in &kinds[i + 1..] {
                graph.add_fn(from, to, 0, move |value| widen(value, to));
            }
        }
    }

    graph.add_fn(ValueKind::BigInt, ValueKind::BigDecimal, 0, |value| match value {
        Value::BigInt(v) => Ok(Value::BigDecimal(BigDecimal::from(v))),
        other => Err(mismatch(&other, ValueKind::BigDecimal)),
    });
}

fn mismatch(value: &Value, to: ValueKind) -> Error {
    Error::Conversion {
        from: value.kind(),
        to,
        message: format!("unexpected input `{value}`"),
    }
}

fn fixed_as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Byte(v) => Some(i64::from(*v)),
        Value::Short(v) => Some(i64::from(*v)),
        Value::Int(v) => Some(i64::from(*v)),
        Value::Long(v) => Some(*v),
        _ => None,
    }
}

fn floating_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Float(v) => Some(f64::from(*v)),
        Value::Double(v) => Some(*v),
        _ => None,
    }
}

fn widen(value: Value, to: ValueKind) -> Result<Value> {
    let out_of_range = |value: &Value| Error::Conversion {
        from: value.kind(),
        to,
        message: format!("`{value}` is out of range"),
    };

    if let Some(n) = fixed_as_i64(&value) {
        return match to {
            ValueKind::Short => i16::try_from(n)
                .map(Value::Short)
                .map_err(|_| out_of_range(&value)),
            ValueKind::Int => i32::try_from(n)
                .map(Value::Int)
                .map_err(|_| out_of_range(&value)),
            ValueKind::Long => Ok(Value::Long(n)),
            ValueKind::BigInt => Ok(Value::BigInt(BigInt::from(n))),
            _ => Err(mismatch(&value, to)),
        };
    }

    if let Some(n) = floating_as_f64(&value) {
        return match to {
            ValueKind::Double => Ok(Value::Double(n)),
            ValueKind::BigDecimal => BigDecimal::try_from(n)
                .map(Value::BigDecimal)
                .map_err(|_| out_of_range(&value)),
            _ => Err(mismatch(&value, to)),
        };
    }

    Err(mismatch(&value, to))
}
