use quill_core::persona::{AgentProfile, PersonaSource, get_default_presets};
use quill_core::repository::PersonaRepository;
use quill_infrastructure::TomlPersonaRepository;
use tempfile::TempDir;

fn custom(id: &str, name: &str) -> AgentProfile {
    AgentProfile {
        id: id.to_string(),
        display_name: name.to_string(),
        specialty_tag: "comedy".to_string(),
        persona_prompt_template: "You are {{ name }}.".to_string(),
        is_available: true,
        is_active_in_config: false,
        source: PersonaSource::User,
    }
}

#[tokio::test]
async fn test_missing_file_returns_presets() {
    let temp_dir = TempDir::new().unwrap();
    let repo = TomlPersonaRepository::with_path(temp_dir.path().join("personas.toml"));

    let personas = repo.get_all().await.expect("Should load personas");
    assert_eq!(personas, get_default_presets());
}

#[tokio::test]
async fn test_save_and_load_personas() {
    let temp_dir = TempDir::new().unwrap();
    let repo = TomlPersonaRepository::with_path(temp_dir.path().join("personas.toml"));

    let personas = vec![custom("rosa", "Rosa Diaz"), custom("kai", "Kai")];
    repo.save_all(&personas).await.expect("Should save personas");

    let loaded = repo.get_all().await.expect("Should load personas");
    assert_eq!(loaded.len(), 2, "Should load 2 personas");
    let rosa = loaded.iter().find(|p| p.id == "rosa").unwrap();
    assert_eq!(rosa.display_name, "Rosa Diaz");
    assert!(!rosa.is_active_in_config);
    assert_eq!(rosa.source, PersonaSource::User);
}

#[tokio::test]
async fn test_flags_default_to_true_when_omitted() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("personas.toml");
    std::fs::write(
        &path,
        r#"
[[persona]]
id = "ivy"
display_name = "Ivy"
specialty_tag = "horror"
persona_prompt_template = "You are {{ name }}."
"#,
    )
    .unwrap();

    let loaded = TomlPersonaRepository::with_path(path).get_all().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert!(loaded[0].is_available);
    assert!(loaded[0].is_active_in_config);
}
