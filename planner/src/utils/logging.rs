use lazy_static::lazy_static;
use parking_lot::RwLock;
use std::cell::RefCell;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{prelude::*, EnvFilter};
use tracing_timing::{Builder, Histogram};

const HISTOGRAM_MAX_NS: u64 = 60_000_000_000;

// Define categories for different types of operations
#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum OperationCategory {
    Planning,
    Costing { subcategory: CostingType },
    GridExtension { subcategory: ExtensionType },
    Selection { subcategory: SelectionType },
    FileIO { subcategory: FileIOType },
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum CostingType {
    Projection,
    OffGrid,
    Hybrid,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum ExtensionType {
    PreElectrification,
    Frontier,
    Admission,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum SelectionType {
    TechnologyChoice,
    TargetEnforcement,
    Summary,
}

#[derive(Hash, Eq, PartialEq, Clone, Debug)]
pub enum FileIOType {
    DataLoad,
    ScenarioLoad,
    ResultsSave,
}

impl OperationCategory {
    pub fn as_str(&self) -> String {
        match self {
            OperationCategory::Planning => "Planning".to_string(),
            OperationCategory::Costing { subcategory } => {
                format!("Costing - {}", match subcategory {
                    CostingType::Projection => "Projection",
                    CostingType::OffGrid => "Off-grid",
                    CostingType::Hybrid => "Hybrid",
                })
            }
            OperationCategory::GridExtension { subcategory } => {
                format!("Grid Extension - {}", match subcategory {
                    ExtensionType::PreElectrification => "Pre-electrification",
                    ExtensionType::Frontier => "Frontier",
                    ExtensionType::Admission => "Admission",
                })
            }
            OperationCategory::Selection { subcategory } => {
                format!("Selection - {}", match subcategory {
                    SelectionType::TechnologyChoice => "Technology Choice",
                    SelectionType::TargetEnforcement => "Target Enforcement",
                    SelectionType::Summary => "Summary",
                })
            }
            OperationCategory::FileIO { subcategory } => {
                format!("File I/O - {}", match subcategory {
                    FileIOType::DataLoad => "Data Load",
                    FileIOType::ScenarioLoad => "Scenario Load",
                    FileIOType::ResultsSave => "Results Save",
                })
            }
        }
    }
}

thread_local! {
    static TIMING_STACK: RefCell<Vec<(String, OperationCategory, Instant)>> = RefCell::new(Vec::new());
}

lazy_static! {
    static ref TIMING_ENABLED: AtomicBool = AtomicBool::new(false);
    static ref FUNCTION_TIMINGS: Arc<RwLock<HashMap<String, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref CATEGORY_TIMINGS: Arc<RwLock<HashMap<OperationCategory, Histogram<u64>>>> = Arc::new(RwLock::new(HashMap::new()));
    static ref HIERARCHICAL_TIMINGS: Arc<RwLock<HashMap<String, (Duration, usize, Vec<String>)>>> = Arc::new(RwLock::new(HashMap::new()));
}

pub struct TimingGuard {
    function_name: String,
    category: OperationCategory,
    start: Instant,
}

impl Drop for TimingGuard {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        record_timing_end(&self.function_name, duration, &self.category);
    }
}

pub fn start_timing(function_name: &str, category: OperationCategory) -> TimingGuard {
    if is_timing_enabled() {
        TIMING_STACK.with(|stack| {
            stack.borrow_mut().push((function_name.to_string(), category.clone(), Instant::now()));
        });
    }

    TimingGuard {
        function_name: function_name.to_string(),
        category,
        start: Instant::now(),
    }
}

fn new_histogram() -> Option<Histogram<u64>> {
    Histogram::<u64>::new_with_bounds(1, HISTOGRAM_MAX_NS, 3).ok()
}

fn record_into<K: Hash + Eq>(map: &RwLock<HashMap<K, Histogram<u64>>>, key: K, duration_ns: u64) {
    let mut timings = map.write();
    let histogram = match timings.entry(key) {
        Entry::Occupied(entry) => entry.into_mut(),
        Entry::Vacant(entry) => match new_histogram() {
            Some(histogram) => entry.insert(histogram),
            None => return,
        },
    };
    let _ = histogram.record(duration_ns);
}

fn record_timing_end(function_name: &str, duration: Duration, category: &OperationCategory) {
    if !is_timing_enabled() {
        return;
    }

    let duration_ns = (duration.as_nanos() as u64).clamp(1, HISTOGRAM_MAX_NS);

    // Pop from timing stack and attribute the call to its parent
    TIMING_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        if stack.pop().is_some() {
            let mut hierarchical = HIERARCHICAL_TIMINGS.write();
            let entry = hierarchical
                .entry(function_name.to_string())
                .or_insert((Duration::from_nanos(0), 0, Vec::new()));

            entry.0 += duration;
            entry.1 += 1;

            if let Some((parent_name, _, _)) = stack.last() {
                if !entry.2.contains(parent_name) {
                    entry.2.push(parent_name.clone());
                }
            }
        }
    });

    record_into(&FUNCTION_TIMINGS, function_name.to_string(), duration_ns);
    record_into(&CATEGORY_TIMINGS, category.clone(), duration_ns);
}

/// Install the global subscriber. `debug` lowers the crate's own level to debug.
pub fn init_logging(enable_timing: bool, debug: bool) -> Result<(), TryInitError> {
    TIMING_ENABLED.store(enable_timing, Ordering::SeqCst);

    let default_directives = if debug { "info,elecplan=debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let timing_template = if enable_timing { new_histogram() } else { None };

    match timing_template {
        Some(template) => {
            let timing_layer = Builder::default().layer(move || template.clone());

            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .with(timing_layer.boxed())
                .try_init()
        }
        None => tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
    }
}

pub fn is_timing_enabled() -> bool {
    TIMING_ENABLED.load(Ordering::SeqCst)
}

pub fn print_timing_report() {
    if !is_timing_enabled() {
        return;
    }

    println!("\nDetailed Performance Report");
    println!("==========================");

    println!("\nHierarchical Timing Analysis:");
    println!("---------------------------");
    let hierarchical = HIERARCHICAL_TIMINGS.read();
    let mut entries: Vec<_> = hierarchical.iter().collect();
    entries.sort_by(|a, b| b.1 .0.cmp(&a.1 .0));

    for (function_name, (total_duration, count, parents)) in entries {
        let avg_duration = total_duration.div_f64((*count).max(1) as f64);
        println!(
            "{}: total={:.2}s, count={}, avg={:.2}ms{}",
            function_name,
            total_duration.as_secs_f64(),
            count,
            avg_duration.as_secs_f64() * 1000.0,
            if !parents.is_empty() {
                format!("\n  Called by: {}", parents.join(", "))
            } else {
                String::new()
            }
        );
    }

    println!("\nSlowest Functions (p95):");
    println!("------------------------");
    let function_timings = FUNCTION_TIMINGS.read();
    let mut function_vec: Vec<_> = function_timings.iter().collect();
    function_vec.sort_by(|a, b| b.1.value_at_quantile(0.95).cmp(&a.1.value_at_quantile(0.95)));
    for (function_name, histogram) in function_vec.into_iter().take(10) {
        println!(
            "{}: p95={:.2}ms, max={:.2}ms, count={}",
            function_name,
            histogram.value_at_quantile(0.95) as f64 / 1_000_000.0,
            histogram.max() as f64 / 1_000_000.0,
            histogram.len()
        );
    }

    println!("\nPerformance by Category:");
    println!("------------------------");
    let category_timings = CATEGORY_TIMINGS.read();
    let mut category_vec: Vec<_> = category_timings.iter().collect();
    category_vec.sort_by(|a, b| b.1.mean().total_cmp(&a.1.mean()));

    let total_time: f64 = category_vec
        .iter()
        .map(|(_, hist)| hist.mean() * (hist.len() as f64))
        .sum();

    for (category, histogram) in category_vec {
        let category_total = histogram.mean() * (histogram.len() as f64);
        let percentage = if total_time > 0.0 { category_total / total_time * 100.0 } else { 0.0 };
        println!(
            "{}: {:.1}% of total time\n  mean={:.2}ms, p95={:.2}ms, p99={:.2}ms, count={}, total={:.2}s",
            category.as_str(),
            percentage,
            histogram.mean() / 1_000_000.0,
            histogram.value_at_quantile(0.95) as f64 / 1_000_000.0,
            histogram.value_at_quantile(0.99) as f64 / 1_000_000.0,
            histogram.len(),
            category_total / 1_000_000_000.0,
        );
    }

    println!("==========================\n");
}
