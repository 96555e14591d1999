//! Integration tests for the hardtack binary

use assert_cmd::Command;
use hardtack_core::{HashingEmbedder, Recipe, RecipeStore};
use predicates::prelude::*;
use tempfile::TempDir;

struct Workspace {
    dir: TempDir,
}

impl Workspace {
    fn new() -> Self {
        Self {
            dir: TempDir::new().unwrap(),
        }
    }

    fn db_path(&self) -> std::path::PathBuf {
        self.dir.path().join("recipes.sqlite")
    }

    fn mirror_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("json")
    }

    fn import_dir(&self) -> std::path::PathBuf {
        self.dir.path().join("imports")
    }

    fn seed(&self) {
        let store = RecipeStore::open(self.db_path()).unwrap();
        let embedder = HashingEmbedder::default();
        let recipes = [
            ("cake1", "Vegan Chocolate Cake", vec!["vegan", "dessert"], Some(4.0)),
            ("stew1", "Beef Stew", vec!["dinner"], Some(3.0)),
        ];
        for (id, dish, tags, rating) in recipes {
            let recipe = Recipe {
                id: id.to_string(),
                dish_name: dish.to_string(),
                tags: tags.into_iter().map(String::from).collect(),
                user_rating: rating,
                date_added: Some("2024-02-10".into()),
                ..Default::default()
            };
            let embedding = embedder.embed_text(&recipe.embedding_text());
            store
                .insert_recipe(&recipe, "feature-hashing", &embedding)
                .unwrap();
        }
    }

    fn cmd(&self) -> Command {
        let mut cmd = Command::cargo_bin("hardtack").unwrap();
        cmd.env("HARDTACK_DB", self.db_path())
            .env("HARDTACK_MIRROR_DIR", self.mirror_dir())
            .env("HARDTACK_IMPORT_DIR", self.import_dir())
            .env("XDG_CONFIG_HOME", self.dir.path().join("config"))
            .env("XDG_DATA_HOME", self.dir.path().join("data"))
            .env("XDG_CACHE_HOME", self.dir.path().join("cache"))
            .env("HARDTACK_LLM_URL", "http://127.0.0.1:9")
            .env_remove("HARDTACK_EMBEDDING_URL")
            .env_remove("RUST_LOG");
        cmd
    }
}

#[test]
fn test_help() {
    Command::cargo_bin("hardtack")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("recommend"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn test_tools_lists_all_five() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("find_single_recipe"))
        .stdout(predicate::str::contains("show_recipe"))
        .stdout(predicate::str::contains("edit_recipe"))
        .stdout(predicate::str::contains("run_recommendation_engine"))
        .stdout(predicate::str::contains("run_processing_pipeline"))
        .stdout(predicate::str::contains("top_k: integer (optional)"));
}

#[test]
fn test_tools_json() {
    let ws = Workspace::new();
    let output = ws.cmd().args(["--format", "json", "tools"]).output().unwrap();
    assert!(output.status.success());

    let tools: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let tools = tools.as_array().unwrap();
    assert_eq!(tools.len(), 5);
    assert_eq!(tools[0]["name"], "find_single_recipe");
    assert_eq!(tools[2]["inputSchema"]["required"][1], "field");
}

#[test]
fn test_status_empty_store() {
    let ws = Workspace::new();
    ws.cmd()
        .arg("status")
        .assert()
        .success()
        .stdout(predicate::str::contains("Recipes:         0"))
        .stdout(predicate::str::contains("feature-hashing"));
}

#[test]
fn test_status_json_lists_recipes() {
    let ws = Workspace::new();
    ws.seed();
    let output = ws.cmd().args(["--format", "json", "status"]).output().unwrap();
    assert!(output.status.success());

    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["recipe_count"], 2);
    assert_eq!(status["embedded_count"], 2);
    let ids: Vec<&str> = status["recipes"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert!(ids.contains(&"cake1"));
}

#[test]
fn test_ask_plain_text_is_echoed() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["ask", "Hello", "there!"])
        .assert()
        .success()
        .stdout("Hello there!\n");
}

#[test]
fn test_ask_malformed_call_falls_back() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["ask", r#"{"function_name": "show_recipe", "arguments": {"#])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sorry, I got mixed up there"));
}

#[test]
fn test_ask_runs_show_recipe() {
    let ws = Workspace::new();
    ws.seed();
    let call = r#"{"function_name": "show_recipe", "arguments": {"recipe_id": "stew1"}}"#;
    ws.cmd()
        .args(["ask", call])
        .assert()
        .success()
        .stdout(predicate::str::contains("Sure! Take a look at this."))
        .stdout(predicate::str::contains("Beef Stew  #stew1"));
}

#[test]
fn test_ask_cannot_import_files_outside_import_dir() {
    let ws = Workspace::new();
    std::fs::create_dir_all(ws.import_dir()).unwrap();
    std::fs::write(ws.dir.path().join("private.html"), "<h1>Private</h1>").unwrap();

    for location in ["/etc/passwd", "../private.html"] {
        let call = format!(
            r#"{{"function_name": "run_processing_pipeline", "arguments": {{"source_type": "file", "url": "{}"}}}}"#,
            location
        );
        let output = ws
            .cmd()
            .args(["--format", "json", "ask", &call])
            .output()
            .unwrap();
        assert!(output.status.success());
        let reply: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
        assert_eq!(reply["type"], "failure");
        assert_eq!(reply["kind"], "invalid_argument");
    }

    let output = ws.cmd().args(["--format", "json", "status"]).output().unwrap();
    let status: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(status["recipe_count"], 0);
    assert_eq!(status["import_dir"], ws.import_dir().to_str().unwrap());
}

#[test]
fn test_show_missing_recipe() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["show", "nope"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("I couldn't find a recipe with id nope."));
}

#[test]
fn test_show_json() {
    let ws = Workspace::new();
    ws.seed();
    let output = ws.cmd().args(["--format", "json", "show", "cake1"]).output().unwrap();
    assert!(output.status.success());

    let recipe: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(recipe["dish_name"], "Vegan Chocolate Cake");
}

#[test]
fn test_recommend_empty_store() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["recommend", "something", "cozy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("couldn't find"));
}

#[test]
fn test_find_with_tag_filter() {
    let ws = Workspace::new();
    ws.seed();
    ws.cmd()
        .args(["find", "chocolate", "tag:vegan"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Vegan Chocolate Cake"))
        .stdout(predicate::str::contains("Beef Stew").not());
}

#[test]
fn test_edit_then_show() {
    let ws = Workspace::new();
    ws.seed();
    ws.cmd()
        .args(["edit", "stew1", "user_rating", "5"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated user_rating for Beef Stew."));

    ws.cmd()
        .args(["show", "stew1"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Rated 5/5"));
    assert!(ws.mirror_dir().join("stew1.json").exists());
}

#[test]
fn test_edit_missing_recipe() {
    let ws = Workspace::new();
    ws.cmd()
        .args(["edit", "nope", "user_notes", "too salty"])
        .assert()
        .code(2);
}

#[test]
fn test_edit_unknown_field() {
    let ws = Workspace::new();
    ws.seed();
    ws.cmd()
        .args(["edit", "stew1", "calories", "400"])
        .assert()
        .failure()
        .code(3);
}
