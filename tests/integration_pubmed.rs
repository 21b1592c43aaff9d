#![expect(
    clippy::tests_outside_test_module,
    reason = "integration tests are only compiled in test mode"
)]

//! PubMed ingestion against a mock E-utilities server, followed by retrieval

use anyhow::Result;
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paper_rag::config::Config;
use paper_rag::database::VectorStore;
use paper_rag::embeddings::Embedder;
use paper_rag::indexer::Indexer;
use paper_rag::projects::Project;
use paper_rag::pubmed::{DEFAULT_QUEUE_PROJECT, PubmedClient, parse_articles, update_queue};
use paper_rag::query::Retriever;

const EFETCH_XML: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">31000001</PMID>
      <Article>
        <Journal><JournalIssue><PubDate><Year>2019</Year></PubDate></JournalIssue><Title>Lancet Neurology</Title></Journal>
        <ArticleTitle>Statin use and dementia risk</ArticleTitle>
        <Abstract><AbstractText Label="FINDINGS">Statin users showed lower dementia incidence.</AbstractText></Abstract>
        <AuthorList><Author><LastName>Smith</LastName><ForeName>Jane</ForeName></Author></AuthorList>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation>
      <PMID Version="1">31000002</PMID>
      <Article>
        <Journal><Title>Cardiology Today</Title></Journal>
        <ArticleTitle>Statins after myocardial infarction</ArticleTitle>
        <Abstract><AbstractText>Cardiac outcomes improved with statins.</AbstractText></Abstract>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>
"#;

/// Counts two topic words per text
struct TopicEmbedder;

impl Embedder for TopicEmbedder {
    fn model_name(&self) -> &str {
        "topics"
    }

    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                vec![
                    lower.matches("dementia").count() as f32,
                    lower.matches("cardiac").count() as f32,
                ]
            })
            .collect())
    }
}

fn create_test_config(server: &MockServer) -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let mut config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    config.ollama.embedding_dimension = 2;
    config.pubmed.base_url = server.uri();
    (config, temp_dir)
}

#[tokio::test(flavor = "multi_thread")]
async fn fetched_abstracts_can_be_queried() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .and(query_param("retmax", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "esearchresult": {"idlist": ["31000001", "31000002"]}
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .and(query_param("id", "31000001,31000002"))
        .respond_with(ResponseTemplate::new(200).set_body_string(EFETCH_XML))
        .expect(1)
        .mount(&server)
        .await;

    let (config, _temp_dir) = create_test_config(&server);
    let client = PubmedClient::new(&config.pubmed);

    let papers = update_queue(
        &config,
        &client,
        &TopicEmbedder,
        "statins",
        2,
        DEFAULT_QUEUE_PROJECT,
    )
    .await?;
    assert_eq!(papers, 2);

    let project = Project::open(&config, DEFAULT_QUEUE_PROJECT)?;
    assert_eq!(project.paper_count()?, 0);

    let results = Retriever::new(&config, &TopicEmbedder)
        .retrieve(&project, "does it prevent dementia", 1)
        .await?;
    assert_eq!(results.len(), 1);
    let best = &results[0];
    assert_eq!(best.chunk.metadata.source, "PMID:31000001");
    assert_eq!(best.chunk.metadata.pages, "1");
    assert!(best.chunk.text.contains("FINDINGS: Statin users showed lower dementia incidence."));
    assert!(best.chunk.text.contains("Authors: Jane Smith"));
    assert!(best.chunk.text.contains("Journal: Lancet Neurology (2019)"));
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn empty_search_indexes_nothing() -> Result<()> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/esearch.fcgi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "esearchresult": {"count": "0", "idlist": []}
        })))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/efetch.fcgi"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let (config, _temp_dir) = create_test_config(&server);
    let client = PubmedClient::new(&config.pubmed);
    let collection = &config.retrieval.collection_name;

    let papers = update_queue(&config, &client, &TopicEmbedder, "zzzz", 5, "fresh").await?;
    assert_eq!(papers, 0);
    assert!(!config.projects_dir().join("fresh").exists());

    let project = Project::create(&config, "queue")?;
    let indexer = Indexer::new(&config, &TopicEmbedder);
    let chunked = indexer.chunk_documents(&parse_articles(EFETCH_XML)?)?;
    indexer.index_chunks(&project, chunked.chunks).await?;
    let before = VectorStore::open(project.index_dir()).await?.list_ids(collection).await?;
    assert_eq!(before, vec!["chunk_0", "chunk_1"]);

    let papers = update_queue(&config, &client, &TopicEmbedder, "zzzz", 5, "queue").await?;
    assert_eq!(papers, 0);

    let after = VectorStore::open(project.index_dir()).await?.list_ids(collection).await?;
    assert_eq!(after, before);
    let results = Retriever::new(&config, &TopicEmbedder)
        .retrieve(&project, "cardiac", 1)
        .await?;
    assert_eq!(results[0].chunk.metadata.source, "PMID:31000002");
    Ok(())
}
