//! End-to-end reload verification against the mock agent binary.

use std::time::Duration;

use harness::{
    wait_until, HarnessError, PipelineBinding, PipelineConfig, ReloadScenario, ScenarioConfig,
    ScenarioState, ServiceProcess,
};

const MOCK_AGENT: &str = env!("CARGO_BIN_EXE_mock_agent");

fn pipeline(name: &str, sources: &[&str], sinks: &[&str]) -> PipelineConfig {
    PipelineConfig::new(vec![PipelineBinding::new(
        name,
        sources.iter().map(|s| s.to_string()).collect(),
        sinks.iter().map(|s| s.to_string()).collect(),
    )])
}

fn scenario_config() -> ScenarioConfig {
    ScenarioConfig::builder(MOCK_AGENT)
        .startup_timeout(Duration::from_secs(30))
        .marker_timeout(Duration::from_secs(10))
        .liveness_timeout(Duration::from_secs(30))
        .build()
}

#[tokio::test]
async fn reload_scenario_reaches_confirmed() {
    let initial = pipeline("meters", &["A"], &["B"]);
    let updated = pipeline("meters", &["A", "C"], &["B"]);

    let state = ReloadScenario::run(scenario_config(), &initial, &updated)
        .await
        .expect("scenario should confirm the reload");
    assert_eq!(state, ScenarioState::ReloadConfirmed);
}

#[tokio::test]
async fn spawning_missing_executable_fails_fast() {
    let initial = pipeline("meters", &["A"], &["B"]);
    let config = ScenarioConfig::builder("/nonexistent/service-binary").build();

    let err = ReloadScenario::run(config, &initial, &initial)
        .await
        .unwrap_err();
    assert!(matches!(err, HarnessError::Spawn { .. }));
}

#[tokio::test]
async fn killed_service_is_not_alive_within_polling_window() {
    let mut service = ServiceProcess::spawn("sleep", ["30"], None).unwrap();
    assert!(service.is_alive());

    service.kill_and_wait().await.unwrap();
    assert!(wait_until(|| !service.is_alive(), Duration::from_secs(5)).await);
}

#[tokio::test]
async fn concurrent_scenarios_do_not_interfere() {
    let initial_a = pipeline("alpha", &["A"], &["B"]);
    let updated_a = pipeline("alpha", &["A", "C"], &["B"]);
    let initial_b = pipeline("beta", &["X"], &["Y"]);
    let updated_b = pipeline("beta", &["X"], &["Y", "Z"]);

    let (a, b) = tokio::join!(
        ReloadScenario::run(scenario_config(), &initial_a, &updated_a),
        ReloadScenario::run(scenario_config(), &initial_b, &updated_b),
    );

    assert_eq!(a.expect("scenario A"), ScenarioState::ReloadConfirmed);
    assert_eq!(b.expect("scenario B"), ScenarioState::ReloadConfirmed);
}

#[tokio::test]
async fn stepwise_scenario_reaches_confirmed() {
    let initial = pipeline("meters", &["A"], &["B"]);
    let updated = pipeline("meters", &["A", "C"], &["B"]);

    let mut scenario = ReloadScenario::new(scenario_config(), &initial).unwrap();
    scenario.start().await.expect("service should start");
    scenario
        .trigger_reload(&updated)
        .expect("reload should be delivered");
    scenario.confirm().await.expect("reload should be confirmed");
    assert_eq!(scenario.state(), ScenarioState::ReloadConfirmed);
    scenario.shutdown().await;
}
