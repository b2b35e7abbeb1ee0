//! End-to-end sweep tests over result files written to temp directories
//!
//! Layout used throughout:
//!
//! ```text
//! <tmp>/solo_eval/ep<N>.json
//! <tmp>/<experiment>/<seed>/eval_data_<agent>/ep<N>.json
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use zsc_eval::config::{ExperimentPaths, MissingEpisodePolicy, SeedGroup, SweepConfig};
use zsc_eval::episode::{EpisodeLoader, StoredResult};
use zsc_eval::relative::RE_MT2;
use zsc_eval::sweep::{read_by_agent, Sweep, AVERAGED};
use zsc_eval::Error;

fn write_result(dir: &Path, id: i64, success: f64, num_steps: f64, collisions: Option<f64>) {
    fs::create_dir_all(dir).unwrap();
    let mut summary = json!({"composite_success": success, "num_steps": num_steps});
    if let Some(collisions) = collisions {
        summary["num_agents_collide"] = json!(collisions);
    }
    let doc = json!({"id": id, "summary": summary});
    fs::write(dir.join(format!("ep{id}.json")), doc.to_string()).unwrap();
}

fn solo_dir(root: &Path, episodes: &[(i64, f64, f64)]) -> PathBuf {
    let dir = root.join("solo_eval");
    for (id, success, steps) in episodes {
        write_result(&dir, *id, *success, *steps, None);
    }
    dir
}

fn config(root: &Path, solo: PathBuf, experiments: BTreeMap<String, ExperimentPaths>) -> SweepConfig {
    let mut config = SweepConfig::new(vec![solo], experiments);
    config.workers = 4;
    config.output = root.join("aggregated_results.json");
    config
}

#[test]
fn test_successful_baseline_scores_half_efficiency() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0)]);
    let seed = tmp.path().join("exp").join("0").join("eval_data_a");
    write_result(&seed, 1, 1.0, 20.0, Some(0.0));

    let mut experiments = BTreeMap::new();
    experiments.insert("exp".to_string(), ExperimentPaths::Seeds(vec![seed.clone()]));
    let sweep = Sweep::new(config(tmp.path(), solo, experiments)).unwrap();
    let solo_means = sweep.load_solo().unwrap();
    let group = SeedGroup {
        label: "0".to_string(),
        dirs: vec![seed],
    };
    let result = sweep.evaluate_group(&group, &solo_means).unwrap();

    let overall = result.overall.unwrap();
    assert!((overall[RE_MT2] - 50.0).abs() < 1e-9);
    assert!((overall["composite_success"] - 100.0).abs() < 1e-9);
    assert!(overall["CR"].abs() < 1e-9);
    assert!((result.per_agent["eval_data_a"][RE_MT2] - 50.0).abs() < 1e-9);
}

#[test]
fn test_failed_baseline_uses_imputed_bound() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0)]);
    let seed = tmp.path().join("exp").join("0").join("eval_data_a");
    write_result(&seed, 1, 0.0, 30.0, None);

    let mut experiments = BTreeMap::new();
    experiments.insert("exp".to_string(), ExperimentPaths::Seeds(vec![seed.clone()]));
    let sweep = Sweep::new(config(tmp.path(), solo, experiments)).unwrap();
    let solo_means = sweep.load_solo().unwrap();
    let group = SeedGroup {
        label: "0".to_string(),
        dirs: vec![seed],
    };
    let overall = sweep.evaluate_group(&group, &solo_means).unwrap().overall.unwrap();

    assert!((overall[RE_MT2] - 10.0 / 15.0 * 100.0).abs() < 1e-9);
    assert!(overall["composite_success"].abs() < 1e-9);
    assert!(!overall.contains_key("CR"));
}

#[test]
fn test_failed_solo_episode_is_excluded() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0), (2, 0.0, 1500.0)]);
    let seed = tmp.path().join("exp").join("0").join("eval_data_a");
    write_result(&seed, 1, 1.0, 20.0, None);
    write_result(&seed, 2, 1.0, 5.0, None);

    let mut experiments = BTreeMap::new();
    experiments.insert("exp".to_string(), ExperimentPaths::Seeds(vec![seed.clone()]));
    let sweep = Sweep::new(config(tmp.path(), solo, experiments)).unwrap();
    let solo_means = sweep.load_solo().unwrap();
    let group = SeedGroup {
        label: "0".to_string(),
        dirs: vec![seed],
    };
    let overall = sweep.evaluate_group(&group, &solo_means).unwrap().overall.unwrap();

    // episode 2 would score 200 if it were counted
    assert!((overall[RE_MT2] - 50.0).abs() < 1e-9);
}

#[test]
fn test_cross_seed_population_std() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0)]);

    let mut seeds = BTreeMap::new();
    for (seed, success, steps) in [("s0", 1.0, 20.0), ("s1", 0.0, 30.0), ("s2", 1.0, 20.0)] {
        let agent_dir = tmp.path().join("exp").join(seed).join("eval_data_x");
        write_result(&agent_dir, 1, success, steps, Some(0.0));
        seeds.insert(seed.to_string(), vec![agent_dir]);
    }
    let mut experiments = BTreeMap::new();
    experiments.insert("GT_coord".to_string(), ExperimentPaths::Agents(seeds));

    let sweep = Sweep::new(config(tmp.path(), solo, experiments)).unwrap();
    let mut out = Vec::new();
    let report = sweep.run(&mut out).unwrap();

    let agent = &report.by_agent["GT_coord"]["eval_data_x"];
    assert!((agent["composite_success"].mean - 66.67).abs() < 0.01);
    assert!((agent["composite_success"].std - 47.14).abs() < 0.01);

    let averaged = &report.by_agent["GT_coord"][AVERAGED];
    assert!((averaged["composite_success"].mean - 66.67).abs() < 0.01);
    assert!(averaged.contains_key(RE_MT2));
    assert!(averaged.contains_key("CR"));

    assert_eq!(
        report.by_seed.keys().collect::<Vec<_>>(),
        vec!["GT_coord.0", "GT_coord.1", "GT_coord.2"]
    );

    let text = String::from_utf8(out).unwrap();
    assert!(text.contains("GT_coord: "));
    assert!(text.contains("GT_coord.eval_data_x: "));
    assert!(text.contains("GT_coord.compiled_results_success: 66.67 \u{00B1} 47.14"));

    let written = read_by_agent(&tmp.path().join("aggregated_results.json")).unwrap();
    assert_eq!(written, report.by_agent);
}

#[test]
fn test_expand_agents_and_heatmap() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0), (2, 1.0, 12.0)]);

    let seed = tmp.path().join("pp").join("0");
    for agent in ["eval_data_ckpt.1.pth", "eval_data_plan_play_-2"] {
        write_result(&seed.join(agent), 1, 1.0, 20.0, Some(2.0));
        write_result(&seed.join(agent), 2, 0.0, 50.0, Some(0.0));
    }
    fs::create_dir_all(seed.join("logs")).unwrap();

    let mut experiments = BTreeMap::new();
    experiments.insert("Pop_play".to_string(), ExperimentPaths::Seeds(vec![seed]));
    let mut sweep_config = config(tmp.path(), solo, experiments);
    sweep_config.expand_agents = true;
    sweep_config.heatmap = Some(zsc_eval::config::HeatmapSettings {
        path: tmp.path().join("heatmap.svg"),
        metric: "CR".to_string(),
    });

    let report = Sweep::new(sweep_config).unwrap().run(&mut Vec::new()).unwrap();
    let agents: Vec<&String> = report.by_agent["Pop_play"].keys().collect();
    assert_eq!(agents, vec![AVERAGED, "eval_data_ckpt.1.pth", "eval_data_plan_play_-2"]);
    // one colliding episode out of two, per agent
    assert!((report.by_agent["Pop_play"][AVERAGED]["CR"].mean - 0.5).abs() < 1e-9);

    let svg = fs::read_to_string(tmp.path().join("heatmap.svg")).unwrap();
    assert!(svg.contains("Learn-Single_1"));
    assert!(svg.contains("Plan_3"));
}

#[test]
fn test_strict_policy_fails_on_missing_episode() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0), (2, 1.0, 10.0)]);
    let seed = tmp.path().join("exp").join("0");
    write_result(&seed, 1, 1.0, 20.0, None);

    let mut experiments = BTreeMap::new();
    experiments.insert("exp".to_string(), ExperimentPaths::Seeds(vec![seed]));

    let mut lenient = config(tmp.path(), solo.clone(), experiments.clone());
    lenient.missing_episodes = MissingEpisodePolicy::Skip;
    assert!(Sweep::new(lenient).unwrap().run(&mut Vec::new()).is_ok());

    let mut strict = config(tmp.path(), solo, experiments);
    strict.missing_episodes = MissingEpisodePolicy::Strict;
    let err = Sweep::new(strict).unwrap().run(&mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::MissingEpisode { episode_id: 2, .. }));
}

#[test]
fn test_strict_policy_fails_on_empty_seed_group() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0)]);
    let seed = tmp.path().join("exp").join("0");
    fs::create_dir_all(&seed).unwrap();

    let mut experiments = BTreeMap::new();
    experiments.insert("exp".to_string(), ExperimentPaths::Seeds(vec![seed]));

    let mut lenient = config(tmp.path(), solo.clone(), experiments.clone());
    lenient.missing_episodes = MissingEpisodePolicy::Skip;
    let report = Sweep::new(lenient).unwrap().run(&mut Vec::new()).unwrap();
    assert!(report.overall.is_empty());

    let mut strict = config(tmp.path(), solo, experiments);
    strict.missing_episodes = MissingEpisodePolicy::Strict;
    let err = Sweep::new(strict).unwrap().run(&mut Vec::new()).unwrap_err();
    assert!(matches!(err, Error::MissingEpisode { episode_id: 1, .. }));
}

#[test]
fn test_missing_directory_fails_before_any_output() {
    let tmp = tempfile::tempdir().unwrap();
    let solo = solo_dir(tmp.path(), &[(1, 1.0, 10.0)]);
    let seed = tmp.path().join("a").join("0");
    write_result(&seed, 1, 1.0, 20.0, None);

    let mut experiments = BTreeMap::new();
    experiments.insert("A".to_string(), ExperimentPaths::Seeds(vec![seed]));
    experiments.insert(
        "B".to_string(),
        ExperimentPaths::Seeds(vec![tmp.path().join("typo")]),
    );

    let mut out = Vec::new();
    let err = Sweep::new(config(tmp.path(), solo, experiments))
        .unwrap()
        .run(&mut out)
        .unwrap_err();
    match err {
        Error::Config(msg) => assert!(msg.contains("typo"), "{msg}"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(out.is_empty());
    assert!(!tmp.path().join("aggregated_results.json").exists());
}

#[test]
fn test_malformed_config_fails_before_output() {
    let tmp = tempfile::tempdir().unwrap();
    let output = tmp.path().join("out.json");
    let text = json!({
        "solo": [tmp.path().join("solo_eval")],
        "experiments": {"exp": 7},
        "output": output,
    })
    .to_string();
    let err = SweepConfig::from_json_str(&text).unwrap_err();
    assert!(matches!(err, Error::Config(_)));
    assert!(!output.exists());
}

#[test]
fn test_binary_results_only_read_for_solo() {
    let tmp = tempfile::tempdir().unwrap();
    let stored = StoredResult {
        id: "4".to_string(),
        summary: [("composite_success".to_string(), 1.0), ("num_steps".to_string(), 33.0)]
            .into_iter()
            .collect(),
    };
    let solo = tmp.path().join("solo_eval");
    let other = tmp.path().join("baseline");
    fs::create_dir_all(&solo).unwrap();
    fs::create_dir_all(&other).unwrap();
    stored.write_to(&solo.join("ep4.bin")).unwrap();
    stored.write_to(&other.join("ep4.bin")).unwrap();

    let loader = EpisodeLoader::new(2).unwrap();
    let from_solo = loader.load_dirs(&[solo]).unwrap();
    assert_eq!(from_solo.len(), 1);
    assert_eq!(from_solo[0].record.id(), 4);
    assert_eq!(from_solo[0].record.metric("num_steps_fail"), Some(33.0));

    assert!(loader.load_dirs(&[other]).unwrap().is_empty());
}

#[test]
fn test_loader_keeps_path_pairing() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path().join("eval_data_z");
    for id in 0..50 {
        write_result(&dir, id, 1.0, 100.0 + id as f64, None);
    }
    fs::write(dir.join("notes.json"), r#"{"summary": {}}"#).unwrap();

    let loaded = EpisodeLoader::new(8).unwrap().load_dirs(&[dir]).unwrap();
    assert_eq!(loaded.len(), 50);
    for episode in &loaded {
        let expected = format!("ep{}.json", episode.record.id());
        assert_eq!(episode.path.file_name().unwrap().to_str().unwrap(), expected);
        assert_eq!(episode.agent(), Some("eval_data_z"));
    }
}
