use log::{debug, info, warn};

use snafu::{prelude::*, ErrorCompat, Snafu};
use vote_tabulator::*;

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use serde_json::Map as JSMap;
use serde_json::Value as JSValue;
use text_diff::print_diff;

use crate::args::Args;

#[derive(Debug, Snafu)]
pub enum TabError {
    #[snafu(display("Error opening file {path}"))]
    OpeningJson {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error rendering JSON"))]
    WritingJson { source: serde_json::Error },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The definitions have {count} errors, see the log for details"))]
    InvalidDefinitions { count: usize },
    #[snafu(display("Tabulator failure"))]
    Tabulator { source: TabulatorError },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type TabResult<T> = Result<T, TabError>;

/// The JSON tabulation config. All paths are relative to the config file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize, Default)]
pub struct TabulationConfig {
    #[serde(rename = "jurisdictionPath")]
    pub jurisdiction_path: Option<String>,
    #[serde(rename = "electionPath")]
    pub election_path: Option<String>,
    #[serde(rename = "counterCountPaths", default)]
    pub counter_count_paths: Vec<String>,
    #[serde(rename = "statePath")]
    pub state_path: Option<String>,
    #[serde(rename = "outputPath")]
    pub output_path: Option<String>,
}

/// The inputs of one run, after merging the config file and the command line.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct RunInputs {
    pub jurisdiction: Option<PathBuf>,
    pub election: Option<PathBuf>,
    pub state: Option<PathBuf>,
    pub counts: Vec<PathBuf>,
    pub out: Option<String>,
    pub reference: Option<PathBuf>,
}

/// The outcome of one run.
#[derive(Debug)]
pub struct RunOutcome {
    pub tabulator: Tabulator,
    pub summary: JSValue,
}

fn read_json<T: DeserializeOwned>(path: &Path) -> TabResult<T> {
    let p = path.display().to_string();
    debug!("read_json: reading {:?}", p);
    let contents = fs::read_to_string(path).context(OpeningJsonSnafu { path: p.clone() })?;
    let res: T = serde_json::from_str(&contents).context(ParsingJsonSnafu { path: p })?;
    Ok(res)
}

fn read_summary(path: &Path) -> TabResult<JSValue> {
    read_json(path)
}

fn write_output(path: &str, contents: &str) -> TabResult<()> {
    if path == "stdout" {
        println!("{}", contents);
    } else {
        info!("write_output: writing state to {:?}", path);
        fs::write(path, contents).context(WritingFileSnafu { path })?;
    }
    Ok(())
}

/// Merges the tabulation config (if any) with the command line.
pub fn resolve_inputs(args: &Args) -> TabResult<RunInputs> {
    let mut inputs = RunInputs::default();
    if let Some(config_path) = &args.config {
        let config_p = Path::new(config_path.as_str());
        let config: TabulationConfig = read_json(config_p)?;
        info!("resolve_inputs: config: {:?}", config);
        let root_p = match config_p.parent() {
            Some(p) => p.to_path_buf(),
            None => whatever!("Missing parent directory for {}", config_path),
        };
        let resolve = |p: &String| -> PathBuf { root_p.join(p) };
        inputs.jurisdiction = config.jurisdiction_path.as_ref().map(resolve);
        inputs.election = config.election_path.as_ref().map(resolve);
        inputs.state = config.state_path.as_ref().map(resolve);
        inputs.counts = config.counter_count_paths.iter().map(resolve).collect();
        inputs.out = config
            .output_path
            .as_ref()
            .map(|p| resolve(p).display().to_string());
    }

    if let Some(p) = &args.jurisdiction {
        inputs.jurisdiction = Some(PathBuf::from(p));
    }
    if let Some(p) = &args.election {
        inputs.election = Some(PathBuf::from(p));
    }
    if let Some(p) = &args.state {
        inputs.state = Some(PathBuf::from(p));
    }
    if !args.counts.is_empty() {
        inputs.counts = args.counts.iter().map(PathBuf::from).collect();
    }
    if let Some(p) = &args.out {
        inputs.out = Some(p.clone());
    }
    inputs.reference = args.reference.as_ref().map(PathBuf::from);
    Ok(inputs)
}

fn load_tabulator(inputs: &RunInputs) -> TabResult<Tabulator> {
    if let Some(state_p) = &inputs.state {
        let snapshot: TabulatorState = read_json(state_p)?;
        info!(
            "load_tabulator: replaying {} counter counts from {:?}",
            snapshot.counter_count_list.len(),
            state_p
        );
        return Tabulator::from_snapshot(snapshot).context(TabulatorSnafu {});
    }

    let (jurisdiction_p, election_p) = match (&inputs.jurisdiction, &inputs.election) {
        (Some(j), Some(e)) => (j, e),
        _ => whatever!("A jurisdiction and an election are required when no state is given"),
    };
    let jurisdiction: Jurisdiction = read_json(jurisdiction_p)?;
    let election: Election = read_json(election_p)?;
    Tabulator::new(jurisdiction, election).context(TabulatorSnafu {})
}

fn triple_to_json(t: &Triple) -> JSValue {
    json!([
        t.counter.as_str(),
        t.reporting_group.as_str(),
        t.precinct.as_str()
    ])
}

fn build_summary_js(tabulator: &Tabulator, errors: &[String], warnings: &[String]) -> JSValue {
    let report = tabulator.state();

    let mut contests: JSMap<String, JSValue> = JSMap::new();
    for ct in tabulator.contest_tallies() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for cc in ct.candidate_count_list.iter() {
            tally.insert(cc.candidate_ident.to_string(), json!(cc.count.to_string()));
        }
        contests.insert(
            ct.contest_ident.to_string(),
            json!({
                "overvote": ct.overvote_count.to_string(),
                "undervote": ct.undervote_count.to_string(),
                "writein": ct.writein_count.to_string(),
                "tally": tally
            }),
        );
    }

    let mut questions: JSMap<String, JSValue> = JSMap::new();
    for qt in tabulator.question_tallies() {
        let mut tally: JSMap<String, JSValue> = JSMap::new();
        for ac in qt.answer_count_list.iter() {
            tally.insert(ac.answer.clone(), json!(ac.count.to_string()));
        }
        questions.insert(
            qt.question_ident.to_string(),
            json!({
                "overvote": qt.overvote_count.to_string(),
                "undervote": qt.undervote_count.to_string(),
                "tally": tally
            }),
        );
    }

    let missing: Vec<JSValue> = report.missing.iter().map(triple_to_json).collect();
    let finished: Vec<&str> = report.finished.iter().map(|p| p.as_str()).collect();
    json!({
        "state": report.state.to_string(),
        "totalExpected": report.total_expected,
        "missing": missing,
        "finished": finished,
        "errors": errors,
        "warnings": warnings,
        "contests": contests,
        "questions": questions
    })
}

/// Runs one tabulation: loads the definitions or a state, adds the counter
/// counts in order, and writes the state if requested.
///
/// Rejected counter counts are reported in the summary and do not stop the run.
pub fn run_tabulation(inputs: &RunInputs) -> TabResult<RunOutcome> {
    let mut tabulator = load_tabulator(inputs)?;
    let mut errors: Vec<String> = tabulator.errors().to_vec();
    let mut warnings: Vec<String> = tabulator.warnings().to_vec();
    for w in warnings.iter() {
        warn!("definitions: {}", w);
    }
    if !tabulator.is_valid() {
        for e in errors.iter() {
            warn!("definitions: {}", e);
        }
        return InvalidDefinitionsSnafu {
            count: errors.len(),
        }
        .fail();
    }

    for count_p in inputs.counts.iter() {
        let cc: CounterCount = read_json(count_p)?;
        let file_ident = cc.file_ident.clone();
        let report = tabulator.add_counter_count(cc).context(TabulatorSnafu {})?;
        if report.accepted {
            info!("run_tabulation: accepted {} from {:?}", file_ident, count_p);
        } else {
            warn!("run_tabulation: rejected {} from {:?}", file_ident, count_p);
            for e in report.errors.iter() {
                warn!("{}: {}", file_ident, e);
            }
        }
        errors.extend(report.errors);
        warnings.extend(report.warnings);
    }

    let summary = build_summary_js(&tabulator, &errors, &warnings);

    if let Some(out_p) = &inputs.out {
        let js = serde_json::to_string_pretty(tabulator.snapshot()).context(WritingJsonSnafu {})?;
        write_output(out_p, &js)?;
    }

    Ok(RunOutcome { tabulator, summary })
}

/// Compares a summary with a reference file, printing the differences.
fn check_reference(summary: &JSValue, reference_p: &Path) -> TabResult<()> {
    let summary_ref = read_summary(reference_p)?;
    debug!("check_reference: reference: {:?}", summary_ref);
    let pretty_js_summary_ref =
        serde_json::to_string_pretty(&summary_ref).context(WritingJsonSnafu {})?;
    let pretty_js_summary = serde_json::to_string_pretty(summary).context(WritingJsonSnafu {})?;
    if pretty_js_summary_ref != pretty_js_summary {
        warn!("Found differences with the reference string");
        print_diff(
            pretty_js_summary_ref.as_str(),
            pretty_js_summary.as_ref(),
            "\n",
        );
        whatever!("Difference detected between calculated summary and reference summary")
    }
    Ok(())
}

pub fn run(args: &Args) -> TabResult<()> {
    let inputs = resolve_inputs(args)?;
    info!("run: inputs: {:?}", inputs);
    let outcome = run_tabulation(&inputs)?;
    info!(
        "run: state {}, {} counter counts accepted",
        outcome.tabulator.state().state,
        outcome.tabulator.snapshot().counter_count_list.len()
    );

    let pretty_js_summary =
        serde_json::to_string_pretty(&outcome.summary).context(WritingJsonSnafu {})?;
    println!("summary:{}", pretty_js_summary);

    if let Some(reference_p) = &inputs.reference {
        check_reference(&outcome.summary, reference_p)?;
    }
    Ok(())
}

pub fn print_error(e: &TabError) {
    eprintln!("An error occured {}", e);
    if let TabError::Tabulator { source } = e {
        eprintln!("caused by: {}", source);
    }
    if let Some(bt) = ErrorCompat::backtrace(e) {
        eprintln!("trace: {}", bt);
    }
}

fn test_dir() -> PathBuf {
    [env!("CARGO_MANIFEST_DIR"), "tests"].iter().collect()
}

fn run_tabulation_test(test_name: &str, config_lpath: &str, summary_lpath: &str) -> TabResult<()> {
    let dir = test_dir().join(test_name);
    info!("Running test {}", test_name);
    let args = Args {
        config: Some(dir.join(config_lpath).display().to_string()),
        jurisdiction: None,
        election: None,
        state: None,
        counts: Vec::new(),
        out: None,
        reference: Some(dir.join(summary_lpath).display().to_string()),
        verbose: false,
    };
    let res = run(&args);
    if let Err(e) = &res {
        warn!("Error occured {:?}", e);
        print_error(e);
    }
    res
}

pub fn test_wrapper(test_name: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    let res = run_tabulation_test(
        test_name,
        format!("{}_config.json", test_name).as_str(),
        format!("{}_expected_summary.json", test_name).as_str(),
    );
    assert!(res.is_ok(), "test {} failed: {:?}", test_name, res.err());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario(name: &str, file: &str) -> PathBuf {
        test_dir().join(name).join(file)
    }

    #[test]
    fn single_precinct() {
        test_wrapper("single_precinct");
    }

    #[test]
    fn two_counters() {
        test_wrapper("two_counters");
    }

    #[test]
    fn rejected_counts() {
        test_wrapper("rejected_counts");
    }

    #[test]
    fn invalid_definitions() {
        let _ = env_logger::builder().is_test(true).try_init();
        let inputs = RunInputs {
            jurisdiction: Some(scenario("invalid_definitions", "jurisdiction.json")),
            election: Some(scenario("invalid_definitions", "election.json")),
            ..RunInputs::default()
        };
        let res = run_tabulation(&inputs);
        assert!(matches!(res, Err(TabError::InvalidDefinitions { count: 2 })));
    }

    #[test]
    fn missing_file() {
        let inputs = RunInputs {
            jurisdiction: Some(scenario("single_precinct", "no_such_file.json")),
            election: Some(scenario("single_precinct", "election.json")),
            ..RunInputs::default()
        };
        let res = run_tabulation(&inputs);
        assert!(matches!(res, Err(TabError::OpeningJson { .. })));
    }

    #[test]
    fn config_paths_are_relative() {
        let args = Args {
            config: Some(scenario("two_counters", "two_counters_config.json").display().to_string()),
            jurisdiction: None,
            election: None,
            state: None,
            counts: vec!["elsewhere.json".to_string()],
            out: None,
            reference: None,
            verbose: false,
        };
        let inputs = resolve_inputs(&args).unwrap();
        assert_eq!(
            inputs.jurisdiction,
            Some(scenario("two_counters", "jurisdiction.json"))
        );
        assert_eq!(inputs.counts, vec![PathBuf::from("elsewhere.json")]);
        assert_eq!(inputs.out, None);
    }

    #[test]
    fn state_round_trip() {
        let _ = env_logger::builder().is_test(true).try_init();
        let state_p = std::env::temp_dir().join(format!("vtab_state_{}.json", std::process::id()));
        let first = RunInputs {
            jurisdiction: Some(scenario("two_counters", "jurisdiction.json")),
            election: Some(scenario("two_counters", "election.json")),
            counts: vec![
                scenario("two_counters", "c1_normal_101.json"),
                scenario("two_counters", "c2_absentee_101.json"),
            ],
            out: Some(state_p.display().to_string()),
            ..RunInputs::default()
        };
        let outcome = run_tabulation(&first).unwrap();
        assert_eq!(outcome.summary["state"], json!("ACCUMULATING"));

        let second = RunInputs {
            state: Some(state_p.clone()),
            counts: vec![scenario("two_counters", "c1_normal_102.json")],
            ..RunInputs::default()
        };
        let outcome = run_tabulation(&second).unwrap();
        let _ = fs::remove_file(&state_p);
        assert_eq!(outcome.summary["state"], json!("DONE"));
        assert_eq!(outcome.summary["missing"], json!([]));
        assert_eq!(
            outcome.summary["contests"]["MAYOR"]["tally"]["ANNA"],
            json!("190")
        );
        assert_eq!(outcome.tabulator.snapshot().counter_count_list.len(), 3);
    }
}
