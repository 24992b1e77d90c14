//! Scripted conversations for the preset agents
//!
//! Each scenario creates its sessions with the initial state the callbacks react to, then
//! plays its turns in order against a freshly built pipeline.

use serde::Serialize;
use serde_json::{json, Map, Value};

use super::AgentKind;
use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::pipeline::{TurnOutcome, TurnPipeline};

pub struct ScenarioTurn {
    pub session_id: &'static str,
    pub message: &'static str,
}

pub struct Scenario {
    pub name: &'static str,
    pub agent: AgentKind,
    pub user_id: &'static str,
    /// Sessions to create, with their initial state
    pub sessions: Vec<(&'static str, Map<String, Value>)>,
    pub turns: Vec<ScenarioTurn>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnReport {
    pub session_id: String,
    pub message: String,
    pub outcome: TurnOutcome,
}

fn state(entries: &[(&str, Value)]) -> Map<String, Value> {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

/// Upload carrying the eight-byte PNG signature
const GARDEN_PHOTO: &str = "Here is a photo of my garden data:image/png;base64,iVBORw0KGgo=";

fn turn(session_id: &'static str, message: &'static str) -> ScenarioTurn {
    ScenarioTurn { session_id, message }
}

pub fn scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            name: "magic_eight_ball",
            agent: AgentKind::MagicEightBall,
            user_id: "fortune_seeker",
            sessions: vec![
                ("happy_session", state(&[("agent_mood", json!("happy"))])),
                ("grumpy_session", state(&[("agent_mood", json!("grumpy"))])),
            ],
            turns: vec![
                turn("happy_session", "Will I have a great day today?"),
                turn("grumpy_session", "Should I invest in cryptocurrency?"),
            ],
        },
        Scenario {
            name: "restaurant_reviewer",
            agent: AgentKind::RestaurantReviewer,
            user_id: "food_critic",
            sessions: vec![
                ("audited_session", state(&[("audit_enabled", json!(true))])),
                ("unaudited_session", state(&[("audit_enabled", json!(false))])),
            ],
            turns: vec![
                turn("audited_session", "Please write a review for Bella Italia restaurant"),
                turn("unaudited_session", "Please write a review for Sushi Zen restaurant"),
            ],
        },
        Scenario {
            name: "content_filter",
            agent: AgentKind::ContentAssistant,
            user_id: "student_user",
            sessions: vec![
                ("safe_session", state(&[("filter_enabled", json!(true))])),
                ("blocked_session", state(&[("filter_enabled", json!(true))])),
                ("enhanced_session", state(&[("filter_enabled", json!(true))])),
                ("guarded_session", state(&[("filter_enabled", json!(false))])),
            ],
            turns: vec![
                turn("safe_session", "Can you explain how photosynthesis works in plants?"),
                turn("blocked_session", "Tell me about violence and harmful activities"),
                turn("enhanced_session", "Please improve my understanding of renewable energy"),
                turn("guarded_session", "Please BLOCK this answer"),
            ],
        },
        Scenario {
            name: "translation_service",
            agent: AgentKind::TranslationService,
            user_id: "translator_user",
            sessions: vec![
                (
                    "normal_session",
                    state(&[("post_process_enabled", json!(true)), ("enhance_translation", json!(false))]),
                ),
                (
                    "enhanced_session",
                    state(&[("post_process_enabled", json!(true)), ("enhance_translation", json!(true))]),
                ),
                (
                    "improved_session",
                    state(&[("post_process_enabled", json!(true)), ("enhance_translation", json!(false))]),
                ),
            ],
            turns: vec![
                turn("normal_session", "Please translate 'Hello, how are you today?' to Spanish"),
                turn(
                    "enhanced_session",
                    "Translate 'Good morning, how are you?' to French with cultural context",
                ),
                turn("improved_session", "Translate 'Guten Tag' to English"),
            ],
        },
        Scenario {
            name: "weather_service",
            agent: AgentKind::WeatherService,
            user_id: "weather_user",
            sessions: vec![
                (
                    "basic_session",
                    state(&[("tools_enabled", json!(true)), ("user_role", json!("basic"))]),
                ),
                (
                    "premium_session",
                    state(&[("tools_enabled", json!(true)), ("user_role", json!("premium"))]),
                ),
                (
                    "blocked_session",
                    state(&[("tools_enabled", json!(false)), ("user_role", json!("basic"))]),
                ),
            ],
            turns: vec![
                turn("basic_session", "Get current weather for New York and 7-day forecast"),
                turn("premium_session", "Get weather forecast for Tokyo for 5 days and check alerts"),
                turn("blocked_session", "What's the weather like in London?"),
                turn("basic_session", "What's the weather in Blockville?"),
            ],
        },
        Scenario {
            name: "calculator",
            agent: AgentKind::Calculator,
            user_id: "math_student",
            sessions: vec![
                (
                    "basic_session",
                    state(&[("validation_enabled", json!(true)), ("add_explanations", json!(false))]),
                ),
                (
                    "enhanced_session",
                    state(&[("validation_enabled", json!(true)), ("add_explanations", json!(true))]),
                ),
                (
                    "error_session",
                    state(&[("validation_enabled", json!(true)), ("add_explanations", json!(true))]),
                ),
            ],
            turns: vec![
                turn("basic_session", "Calculate 15 * 8 + 32 / 4"),
                turn("enhanced_session", "Calculate sin(45) and convert 100 feet to meters"),
                turn("error_session", "Calculate sqrt(-1) and divide by zero"),
            ],
        },
        Scenario {
            name: "customer_preferences",
            agent: AgentKind::CustomerPreferences,
            user_id: "maria_123",
            sessions: vec![("first_visit", Map::new()), ("second_visit", Map::new())],
            turns: vec![
                turn("first_visit", "Hi! My name is Maria and my skin type is seca."),
                turn("second_visit", "Can you recommend some hidratante products?"),
                turn("second_visit", "I have a question about my last order"),
            ],
        },
        Scenario {
            name: "refund_assistant",
            agent: AgentKind::RefundAssistant,
            user_id: "support_customer",
            sessions: vec![("massini_session", Map::new()), ("erike_session", Map::new())],
            turns: vec![
                turn(
                    "massini_session",
                    "Hi, I'm Massini. My order was shipped insured and arrived damaged.",
                ),
                turn("massini_session", "Please refund R$ 74.80 for order NAT002-20250610"),
                turn("erike_session", "This is Erike, my package was late."),
            ],
        },
        Scenario {
            name: "image_studio",
            agent: AgentKind::ImageStudio,
            user_id: "artist",
            sessions: vec![("studio_session", Map::new())],
            turns: vec![
                turn("studio_session", "Generate an image of a lighthouse at sunset"),
                turn("studio_session", "Create a picture of a red fox in the snow"),
                turn("studio_session", "List my images"),
            ],
        },
        Scenario {
            name: "image_analyzer",
            agent: AgentKind::ImageAnalyzer,
            user_id: "photographer",
            sessions: vec![("upload_session", Map::new())],
            turns: vec![
                turn("upload_session", GARDEN_PHOTO),
                turn("upload_session", "Show me the image I sent"),
                turn("upload_session", "List my artifacts"),
            ],
        },
        Scenario {
            name: "memory_assistant",
            agent: AgentKind::MemoryAssistant,
            user_id: "maria_456",
            sessions: vec![("first_chat", Map::new()), ("second_chat", Map::new())],
            turns: vec![
                turn("first_chat", "Hi! I'm Maria and I love the lavender soap."),
                turn("second_chat", "What did I tell you last time about my lavender soap?"),
                turn("second_chat", "Do you remember anything about perfume?"),
            ],
        },
    ]
}

/// Play `scenario` on an already built pipeline
pub async fn run_on(pipeline: &TurnPipeline, scenario: &Scenario) -> Result<Vec<TurnReport>, PipelineError> {
    for (session_id, initial) in &scenario.sessions {
        pipeline.create_session(scenario.user_id, session_id, initial.clone())?;
    }

    let mut reports = Vec::with_capacity(scenario.turns.len());
    for turn in &scenario.turns {
        log::info!("[SCENARIO] {} / {}: {}", scenario.name, turn.session_id, turn.message);
        let outcome = pipeline
            .run_turn(scenario.user_id, turn.session_id, turn.message)
            .await?;
        reports.push(TurnReport {
            session_id: turn.session_id.to_string(),
            message: turn.message.to_string(),
            outcome,
        });
    }
    Ok(reports)
}

pub async fn run_scenario(base: &PipelineConfig, scenario: &Scenario) -> Result<Vec<TurnReport>, PipelineError> {
    let pipeline = scenario.agent.build(base);
    run_on(&pipeline, scenario).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::builtin::{GRUMPY_RESPONSES, SAFETY_MESSAGE, SAFETY_NOTICES};
    use crate::hooks::InterceptionPoint;

    async fn play(name: &str) -> Vec<TurnReport> {
        let scenario = scenarios()
            .into_iter()
            .find(|s| s.name == name)
            .unwrap();
        run_scenario(&PipelineConfig::default(), &scenario).await.unwrap()
    }

    #[test]
    fn test_scenario_names_are_unique() {
        let all = scenarios();
        let mut names: Vec<&str> = all.iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), all.len());
        assert_eq!(all.len(), AgentKind::all().len());
    }

    #[tokio::test]
    async fn test_magic_eight_ball_moods() {
        let reports = play("magic_eight_ball").await;
        let happy = &reports[0].outcome;
        assert_eq!(happy.model_calls, 2);
        assert_eq!(happy.tools_invoked(), 1);
        assert!(happy.text().starts_with("🎱 Madame Mystique"));

        let grumpy = &reports[1].outcome;
        assert_eq!(grumpy.model_calls, 0);
        assert_eq!(grumpy.short_circuits, vec![InterceptionPoint::PreTurn]);
        assert!(GRUMPY_RESPONSES.contains(&grumpy.text()));
    }

    #[tokio::test]
    async fn test_restaurant_audit_rewrites_thin_review() {
        let reports = play("restaurant_reviewer").await;
        let audited = reports[0].outcome.text();
        assert!(audited.starts_with("⭐ Review of Bella Italia in Downtown"));
        assert!(audited.contains("Service:"));

        let unaudited = reports[1].outcome.text();
        assert!(unaudited.contains("Restaurant: Sushi Zen"));
        assert!(!unaudited.contains("Service:"));
    }

    #[tokio::test]
    async fn test_content_filter_paths() {
        let reports = play("content_filter").await;
        assert!(reports[0].outcome.text().contains("photosynthesis"));
        assert_eq!(reports[0].outcome.model_calls, 1);

        let blocked = &reports[1].outcome;
        assert_eq!(blocked.model_calls, 0);
        assert!(SAFETY_NOTICES.contains(&blocked.text()));

        assert!(reports[2].outcome.text().contains("renewable energy"));
        assert_eq!(reports[3].outcome.text(), SAFETY_MESSAGE);
    }

    #[tokio::test]
    async fn test_translation_post_processing() {
        let reports = play("translation_service").await;
        assert!(reports[0].outcome.text().starts_with("🌍 On it:"));
        assert!(reports[1].outcome.text().contains("Enhanced French Translation"));
        assert_eq!(reports[1].outcome.tools_invoked(), 1);
        assert!(reports[2]
            .outcome
            .text()
            .contains("Improved Translation Service Response"));
    }

    #[tokio::test]
    async fn test_weather_permissions() {
        let reports = play("weather_service").await;

        let basic = &reports[0].outcome;
        let forecast = basic
            .tool_runs
            .iter()
            .find(|r| r.call.name == "get_weather_forecast")
            .unwrap();
        assert!(forecast.blocked);
        assert!(forecast.result["error"].as_str().unwrap().contains("Access denied"));
        assert_eq!(basic.tools_invoked(), 1);

        let premium = &reports[1].outcome;
        assert_eq!(premium.tools_invoked(), 2);
        assert_eq!(premium.tool_runs[0].call.arguments["days"], 5);

        assert_eq!(reports[2].outcome.tools_invoked(), 0);
        assert!(reports[2].outcome.text().contains("disabled"));

        let blockville = &reports[3].outcome.tool_runs[0];
        assert!(blockville.blocked);
        assert_eq!(blockville.result["blocked"], true);
    }

    #[tokio::test]
    async fn test_calculator_validation() {
        let reports = play("calculator").await;

        let basic = &reports[0].outcome.tool_runs[0].result;
        assert_eq!(basic["result"], 128.0);
        assert_eq!(basic["alternative_forms"]["integer"], 128);
        assert_eq!(basic["step_by_step"], "Evaluating: 15 * 8 + 32 / 4");

        let enhanced = &reports[1].outcome;
        assert_eq!(enhanced.tools_invoked(), 2);
        assert!(enhanced
            .tool_runs
            .iter()
            .all(|r| r.result.get("detailed_explanation").is_some()));

        let errors = &reports[2].outcome;
        assert_eq!(errors.tools_invoked(), 2);
        assert!(errors.tool_runs.iter().all(|r| r.result["status"] == "error"));
        assert!(errors.tool_runs.iter().all(|r| r.result.get("error_help").is_some()));
    }

    #[tokio::test]
    async fn test_preferences_follow_the_user_across_sessions() {
        let reports = play("customer_preferences").await;
        assert_eq!(reports[0].outcome.tools_invoked(), 2);

        let recommendation = reports[1].outcome.text();
        assert!(recommendation.contains("Recommendations for Maria (seca skin)"));
        assert!(recommendation.contains("Creme Hidratante Intensivo"));

        assert_eq!(reports[2].outcome.tool_runs[0].call.name, "track_interaction");
    }

    #[tokio::test]
    async fn test_refund_flow() {
        let reports = play("refund_assistant").await;
        let first = &reports[0].outcome;
        assert_eq!(first.tools_invoked(), 2);
        let eligibility = first
            .tool_runs
            .iter()
            .find(|r| r.call.name == "check_refund_eligibility")
            .unwrap();
        assert_eq!(eligibility.result, true);

        assert!(reports[1].outcome.text().contains("REF-NAT002-20250610-7480"));

        let late = reports[2]
            .outcome
            .tool_runs
            .iter()
            .find(|r| r.call.name == "check_refund_eligibility")
            .unwrap();
        assert_eq!(late.result, false);
    }

    #[tokio::test]
    async fn test_image_studio_lists_generated_images() {
        let reports = play("image_studio").await;
        assert!(reports[0].outcome.text().contains("Prompt: a lighthouse at sunset"));
        let listing = reports[2].outcome.text();
        assert_eq!(listing.matches("• generated_image_").count(), 2);
        assert!(listing.contains("Prompt: a red fox in the snow"));
    }

    #[tokio::test]
    async fn test_image_analyzer_saves_uploads() {
        let reports = play("image_analyzer").await;
        let upload = reports[0].outcome.text();
        assert!(upload.contains("[uploaded image: uploaded_image_"));
        assert!(!upload.contains("base64"));

        let shown = reports[1].outcome.text();
        assert!(shown.contains("Image loaded: uploaded_image_"));
        assert!(shown.contains("• Size: 8 bytes"));

        let listing = reports[2].outcome.text();
        assert_eq!(listing.matches("• uploaded_image_").count(), 1);
        assert!(listing.contains("  - Type: image/png\n"));
    }

    #[tokio::test]
    async fn test_memory_carries_across_sessions() {
        let reports = play("memory_assistant").await;
        assert_eq!(reports[0].outcome.tools_invoked(), 0);

        let recall = &reports[1].outcome;
        assert_eq!(recall.tool_runs[0].call.arguments["query"], "lavender soap");
        let memories = recall.tool_runs[0].result["memories"].as_array().unwrap();
        assert!(!memories.is_empty());
        assert!(memories.iter().all(|m| m["session_id"] == "first_chat"));
        assert!(recall.text().contains("I love the lavender soap"));

        let nothing = &reports[2].outcome.tool_runs[0].result;
        assert_eq!(nothing["memories"], json!([]));
    }
}
