use super::*;
use tempfile::TempDir;

fn test_config() -> (Config, TempDir) {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let config = Config {
        base_dir: temp_dir.path().to_path_buf(),
        ..Config::default()
    };
    (config, temp_dir)
}

#[test]
fn sanitize_examples() {
    let cases = [
        ("My Papers", "My_Papers"),
        ("  spaced   out  ", "spaced_out"),
        ("../../etc/passwd", "etc_passwd"),
        ("naïve bayes", "nave_bayes"),
        ("report (final).pdf", "report_final.pdf"),
        ("_hidden.", "hidden"),
        ("deep-learning_2024", "deep-learning_2024"),
    ];
    for (input, expected) in cases {
        assert_eq!(
            sanitize_name(input).expect("name should sanitize"),
            expected,
            "input {:?}",
            input
        );
    }
}

#[test]
fn unusable_names_are_rejected() {
    for input in ["", "   ", "..", "///", "日本語"] {
        assert!(
            matches!(sanitize_name(input), Err(RagError::InvalidProjectName(_))),
            "input {:?}",
            input
        );
    }
}

#[test]
fn create_and_open() {
    let (config, _temp_dir) = test_config();

    let created = Project::create(&config, "Graph Networks").expect("should create project");
    assert_eq!(created.name(), "Graph_Networks");
    assert!(created.papers_dir().is_dir());
    assert!(!created.is_indexed("papers"));

    let opened = Project::open(&config, "Graph Networks").expect("should open project");
    assert_eq!(opened, created);
}

#[test]
fn create_twice_fails() {
    let (config, _temp_dir) = test_config();
    Project::create(&config, "dup").expect("should create project");
    assert!(matches!(
        Project::create(&config, "dup"),
        Err(RagError::ProjectExists { project }) if project == "dup"
    ));
}

#[test]
fn missing_project_is_not_found() {
    let (config, _temp_dir) = test_config();
    assert!(matches!(
        Project::open(&config, "ghost"),
        Err(RagError::ProjectNotFound { .. })
    ));

    let created = Project::open_or_create(&config, "ghost").expect("should create on demand");
    assert!(created.root().is_dir());
}

#[test]
fn add_papers_copies_pdfs_and_skips_others() {
    let (config, temp_dir) = test_config();
    let project = Project::create(&config, "vision").expect("should create project");

    let inbox = temp_dir.path().join("inbox");
    std::fs::create_dir_all(&inbox).expect("should create inbox");
    let pdf = inbox.join("My Paper.PDF");
    let notes = inbox.join("notes.txt");
    std::fs::write(&pdf, b"%PDF-1.5 fake").expect("should write pdf");
    std::fs::write(&notes, b"not a paper").expect("should write notes");

    let report = project
        .add_papers(&[pdf, notes.clone()])
        .expect("should add papers");

    assert_eq!(report.added, vec!["My_Paper.PDF"]);
    assert_eq!(report.skipped, vec![notes]);
    assert_eq!(project.paper_count().expect("should count"), 1);
    assert!(project.papers_dir().join("My_Paper.PDF").is_file());
}

#[test]
fn paper_paths_are_sorted() {
    let (config, _temp_dir) = test_config();
    let project = Project::create(&config, "sorted").expect("should create project");
    for name in ["c.pdf", "a.pdf", "b.pdf", "PMID_1.txt"] {
        std::fs::write(project.papers_dir().join(name), b"x").expect("should write file");
    }

    let names: Vec<String> = project
        .paper_paths()
        .expect("should list papers")
        .iter()
        .filter_map(|p| p.file_name().map(|n| n.to_string_lossy().into_owned()))
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
}

#[test]
fn list_reports_counts_and_index_state() {
    let (config, _temp_dir) = test_config();
    assert!(list_projects(&config).expect("should list").is_empty());

    let beta = Project::create(&config, "beta").expect("should create project");
    Project::create(&config, "alpha").expect("should create project");
    std::fs::write(beta.papers_dir().join("one.pdf"), b"x").expect("should write file");
    std::fs::create_dir_all(beta.index_dir().join("papers.lance")).expect("should create table dir");

    let listed = list_projects(&config).expect("should list");
    assert_eq!(
        listed,
        vec![
            ProjectSummary {
                name: "alpha".to_string(),
                paper_count: 0,
                indexed: false,
            },
            ProjectSummary {
                name: "beta".to_string(),
                paper_count: 1,
                indexed: true,
            },
        ]
    );
}

#[test]
fn delete_removes_everything() {
    let (config, _temp_dir) = test_config();
    let project = Project::create(&config, "gone").expect("should create project");
    let root = project.root().to_path_buf();
    std::fs::write(project.papers_dir().join("x.pdf"), b"x").expect("should write file");

    project.delete().expect("should delete project");
    assert!(!root.exists());
    assert!(matches!(
        Project::open(&config, "gone"),
        Err(RagError::ProjectNotFound { .. })
    ));
}
