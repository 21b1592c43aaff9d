use super::*;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(server: &MockServer) -> LlmConfig {
    LlmConfig {
        base_url: format!("{}/v1/", server.uri()),
        model: "test-model".to_string(),
        api_key_env: "PAPER_RAG_TEST_API_KEY".to_string(),
        timeout_secs: 5,
    }
}

#[test]
fn prompts_embed_context_and_question() {
    let (system, user) = build_prompts("chunk one\n\nchunk two", "What is attention?");
    assert_eq!(system, SYSTEM_PROMPT);
    assert_eq!(
        user,
        "Context:\nchunk one\n\nchunk two\n\nQuestion: What is attention?"
    );
    assert!(system.contains("ONLY"));
    assert!(system.contains("page"));
}

#[tokio::test(flavor = "multi_thread")]
async fn reply_is_returned_verbatim() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("Authorization", "Bearer secret"))
        .and(body_partial_json(json!({
            "model": "test-model",
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": "Context:\nctx\n\nQuestion: q"}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{"message": {"role": "assistant", "content": "  An answer (paper.pdf, p. 2)\n"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server), "secret".to_string());
    let (system, user) = build_prompts("ctx", "q");
    let reply = tokio::task::spawn_blocking(move || client.complete(&system, &user)).await??;

    assert_eq!(reply, "  An answer (paper.pdf, p. 2)\n");
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn http_errors_are_upstream_errors_without_retry() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503))
        .expect(1)
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server), "secret".to_string());
    let result = tokio::task::spawn_blocking(move || client.complete("s", "u")).await?;

    match result {
        Err(RagError::Upstream(message)) => assert!(message.contains("503")),
        other => panic!("expected upstream error, got {:?}", other),
    }
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_choices_are_upstream_errors() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let client = ChatClient::new(&config_for(&server), "secret".to_string());
    let result = tokio::task::spawn_blocking(move || client.complete("s", "u")).await?;

    assert!(matches!(result, Err(RagError::Upstream(_))));
    Ok(())
}

#[test]
#[serial]
fn api_key_comes_from_configured_variable() {
    let config = LlmConfig {
        api_key_env: "PAPER_RAG_TEST_API_KEY".to_string(),
        ..LlmConfig::default()
    };

    // SAFETY: serialized with every other test touching this variable
    unsafe { std::env::remove_var("PAPER_RAG_TEST_API_KEY") };
    assert!(matches!(
        ChatClient::from_config(&config),
        Err(RagError::Config(_))
    ));

    // SAFETY: as above
    unsafe { std::env::set_var("PAPER_RAG_TEST_API_KEY", "from-env") };
    let client = ChatClient::from_config(&config).expect("key should be read");
    assert_eq!(client.api_key, "from-env");
    assert_eq!(
        client.endpoint,
        "https://router.huggingface.co/v1/chat/completions"
    );

    // SAFETY: as above
    unsafe { std::env::remove_var("PAPER_RAG_TEST_API_KEY") };
}
