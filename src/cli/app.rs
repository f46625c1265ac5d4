//! CLI module for the prepase application
//!
//! This module wires the stores and remote clients together and maps every
//! subcommand onto the matching library flow.
use std::{
    fs,
    future::Future,
    io::{stdin, stdout, Write},
    path::{Path, PathBuf},
    sync::Arc,
};

use console::style;
use log::{debug, info};
use tempfile::TempDir;

use crate::{
    unique_object_name, upload_base64, upload_bytes, AccountService, AnalysisClient, Commands,
    Config, ConfigCommands, DictionaryClient, DocumentStore, FileObjectStore, FileStore,
    FontCommands, FontLibrary, MemoryObjectStore, MemoryStore, NewNote, Note, NoteQuery,
    NoteStorage, ObjectStore, OperationCell, PrepaseError, Result, Session, SharingDesk,
    SortOrder, Status, truncate_text,
};

/// Stores and clients shared by all commands
#[derive(Clone)]
pub struct Services {
    pub accounts: AccountService,
    pub notes: NoteStorage,
    pub fonts: FontLibrary,
    pub sharing: SharingDesk,
    pub objects: Arc<dyn ObjectStore>,
    pub analysis: AnalysisClient,
    pub dictionary: DictionaryClient,
}

impl Services {
    /// Builds services over the given stores, with clients configured from `config`
    pub fn with_stores(
        config: &Config,
        store: Arc<dyn DocumentStore>,
        objects: Arc<dyn ObjectStore>,
    ) -> Result<Self> {
        let notes = NoteStorage::new(Arc::clone(&store));
        Ok(Self {
            accounts: AccountService::new(Arc::clone(&store)),
            fonts: FontLibrary::new(Arc::clone(&store), Arc::clone(&objects)),
            sharing: SharingDesk::new(notes.clone()).reset_issue_after(config.issue_reset()),
            notes,
            objects,
            analysis: AnalysisClient::new(config.backend_url()?, config.backend_timeout())?,
            dictionary: DictionaryClient::new(config.dictionary_url()?, config.dictionary_timeout())?,
        })
    }

    /// Filesystem-backed services rooted at the configured directories
    pub fn from_config(config: &Config) -> Result<Self> {
        let store = FileStore::open(config.data_dir.join("db"))?;
        let objects = FileObjectStore::new(
            &config.objects_dir,
            config.bucket.clone(),
            config.public_base_url()?,
        );
        Self::with_stores(config, Arc::new(store), Arc::new(objects))
    }

    /// In-memory services that vanish with the process
    pub fn ephemeral(config: &Config) -> Result<Self> {
        let objects = MemoryObjectStore::new(config.bucket.clone(), config.public_base_url()?);
        Self::with_stores(config, Arc::new(MemoryStore::new()), Arc::new(objects))
    }
}

/// CLI Application handler - processes CLI commands against the services
pub struct App {
    services: Services,

    /// Application configuration
    config: Config,

    /// Where `config set|reset` writes
    config_path: PathBuf,

    /// Whether to display verbose output
    verbose: bool,
}

impl App {
    pub fn new(services: Services, config: Config, config_path: PathBuf, verbose: bool) -> Self {
        Self {
            services,
            config,
            config_path,
            verbose,
        }
    }

    /// Run the CLI application with the given command
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Register {
                username,
                password,
                confirm,
            } => self.handle_register(username, password, confirm).await?,

            Commands::Login { username, password } => {
                self.handle_login(username, password).await?
            }

            Commands::Logout => {
                if Session::clear(&self.config.data_dir)? {
                    println!("Logged out.");
                } else {
                    println!("Nobody is logged in.");
                }
            }

            Commands::ResetPassword {
                username,
                new_password,
                confirm,
            } => {
                let accounts = self.services.accounts.clone();
                self.track("Resetting password", async move {
                    accounts
                        .reset_password(&username, &new_password, &confirm)
                        .await
                })
                .await?;
                println!("Password updated, log in with the new password.");
            }

            Commands::Profile => self.handle_profile().await?,

            Commands::Add { title, content } => {
                let new_note = NewNote::manual(&title, &content)?;
                self.save_note(new_note).await?;
            }

            Commands::Import { file, title } => self.handle_import(&file, title).await?,

            Commands::List {
                search,
                order,
                limit,
                json,
            } => self.list_notes(search, order, limit, json).await?,

            Commands::View { id, json } => self.handle_view(&id, json).await?,

            Commands::Update { id, title, content } => {
                let user = self.current_user()?;
                let notes = self.services.notes.clone();
                let note = self
                    .track("Updating note", async move {
                        notes.update_note(&user, &id, &title, &content).await
                    })
                    .await?;
                println!("Note '{}' ({}) updated.", note.title, note.id);
            }

            Commands::Delete { id, force } => self.handle_delete(id, force).await?,

            Commands::Share { id } => {
                let user = self.current_user()?;
                let code = self.services.sharing.generate(&user, &id).await?;
                println!("Sharing code: {}", style(code.to_string()).bold());
                println!("{}", code.share_message());
            }

            Commands::Access { code, save } => self.handle_access(&code, save).await?,

            Commands::DetectLanguage { id } => self.handle_detect_language(&id).await?,

            Commands::Translate { id, to } => {
                let note = self.note_for_analysis(&id).await?;
                let analysis = self.services.analysis.clone();
                let translation = self
                    .track("Translating", async move {
                        analysis.translate(&note.content, &to).await
                    })
                    .await?;
                println!("{}", translation.translated_text);
            }

            Commands::Summarize { id } => self.handle_summarize(&id).await?,

            Commands::Correct { id } => {
                let note = self.note_for_analysis(&id).await?;
                let analysis = self.services.analysis.clone();
                let correction = self
                    .track("Checking grammar", async move {
                        analysis.correct(&note.content).await
                    })
                    .await?;
                println!("{}", correction.corrected_text);
            }

            Commands::Keywords { id } => self.handle_keywords(&id).await?,

            Commands::Visualize { id } => {
                let note = self.note_for_analysis(&id).await?;
                let analysis = self.services.analysis.clone();
                let visualization = self
                    .track("Generating diagram", async move {
                        analysis.visualize_note(&note.content).await
                    })
                    .await?;
                if let Some(text) = &visualization.translated_text {
                    println!("Translated text: {}", text);
                }
                println!("Diagram: {}", visualization.diagram.image_url);
            }

            Commands::ImageToNote {
                image,
                title,
                base64,
            } => self.handle_image_to_note(&image, title, base64).await?,

            Commands::Font(FontCommands::Add { file, title }) => {
                self.handle_add_font(&file, &title).await?
            }

            Commands::Font(FontCommands::List) => self.handle_list_fonts().await?,

            Commands::Handwriting { id, font } => self.handle_handwriting(&id, &font).await?,

            Commands::Lookup { word } => self.handle_lookup(&word).await?,

            Commands::Config(command) => {
                run_config_command(&self.config, &self.config_path, command)?
            }
        }

        Ok(())
    }

    /// Runs one flow through a fresh operation cell, echoing its status in
    /// verbose mode. Each invocation dispatches a single command, so the cell
    /// only reports status here; the long-lived guards sit on `SharingDesk`.
    async fn track<T, F>(&self, operation: &str, task: F) -> Result<T>
    where
        T: Clone + Send + 'static,
        F: Future<Output = Result<T>>,
    {
        let cell = OperationCell::new(operation);
        if self.verbose {
            println!("[{}] {}", style(Status::Loading).dim(), operation);
        }
        let outcome = cell.run(task).await;
        if self.verbose {
            println!("[{}] {}", style(cell.status()).dim(), operation);
        }
        outcome
    }

    fn current_user(&self) -> Result<String> {
        Ok(Session::require(&self.config.data_dir)?.username)
    }

    async fn handle_register(&self, username: String, password: String, confirm: String) -> Result<()> {
        let accounts = self.services.accounts.clone();
        let username = self
            .track("Registering", async move {
                accounts.register(&username, &password, &confirm).await
            })
            .await?;
        println!("Registered {}. You can log in now.", style(username).bold());
        Ok(())
    }

    async fn handle_login(&self, username: String, password: String) -> Result<()> {
        let accounts = self.services.accounts.clone();
        let username = self
            .track("Logging in", async move { accounts.login(&username, &password).await })
            .await?;
        Session::new(&username).save(&self.config.data_dir)?;
        println!("Logged in as {}.", style(username).bold());
        Ok(())
    }

    async fn handle_profile(&self) -> Result<()> {
        let user = self.current_user()?;
        let count = self.services.notes.count_notes(&user).await?;
        println!("Username: {}", style(&user).bold());
        println!("Notes:    {}", count);
        Ok(())
    }

    async fn save_note(&self, new_note: NewNote) -> Result<Note> {
        let user = self.current_user()?;
        let notes = self.services.notes.clone();
        let note = self
            .track("Saving note", async move { notes.add_note(&user, new_note).await })
            .await?;
        println!("Note saved with ID: {}", style(&note.id).bold());
        Ok(note)
    }

    async fn handle_import(&self, file: &Path, title: Option<String>) -> Result<()> {
        if !file.exists() {
            return Err(PrepaseError::validation(format!(
                "File not found: {}",
                file.display()
            )));
        }
        let content = fs::read_to_string(file)?;
        let source = file.file_name().map(|name| name.to_string_lossy().to_string());
        info!("Importing {} ({} bytes)", file.display(), content.len());

        let new_note = NewNote::imported(
            title.as_deref().unwrap_or_default(),
            &content,
            source.as_deref(),
        )?;
        self.save_note(new_note).await?;
        Ok(())
    }

    async fn list_notes(
        &self,
        search: Option<String>,
        order: SortOrder,
        limit: Option<usize>,
        json: bool,
    ) -> Result<()> {
        let user = self.current_user()?;
        let query = NoteQuery {
            search,
            order,
            limit,
        };
        let notes = self.services.notes.clone();
        let listed = self
            .track("Loading notes", async move { notes.list_notes(&user, &query).await })
            .await?;

        if json {
            println!("{}", serde_json::to_string_pretty(&listed)?);
        } else {
            self.display_notes_text(&listed);
        }
        Ok(())
    }

    fn display_notes_text(&self, notes: &[Note]) {
        if notes.is_empty() {
            println!("No notes found matching the criteria.");
            return;
        }

        let term_width = terminal_size::terminal_size()
            .map(|(w, _)| w.0 as usize)
            .unwrap_or(80);
        let preview_width = term_width.saturating_sub(4).max(20);

        for note in notes {
            let title = if note.title.is_empty() {
                "(untitled)"
            } else {
                note.title.as_str()
            };
            println!("{}  {}", style(&note.id).dim(), style(title).bold());
            println!("    {}", Self::format_timestamp(note));
            let first_line = note.content.lines().next().unwrap_or_default();
            if !first_line.is_empty() {
                println!("    {}", truncate_text(first_line, preview_width));
            }
        }
        println!("\n{} note(s)", notes.len());
    }

    fn format_timestamp(note: &Note) -> String {
        note.created_at()
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "Date unavailable".to_string())
    }

    async fn handle_view(&self, id: &str, json: bool) -> Result<()> {
        let user = self.current_user()?;
        let note = self.services.notes.get_note(&user, id).await?;
        if json {
            println!("{}", serde_json::to_string_pretty(&note)?);
            return Ok(());
        }
        Self::print_note(&note);
        Ok(())
    }

    fn print_note(note: &Note) {
        println!("ID:      {}", note.id);
        println!("Title:   {}", style(&note.title).bold());
        println!("Created: {}", Self::format_timestamp(note));
        if let Some(source) = &note.source {
            println!("Source:  {}", source);
        }
        println!("\n{}", note.content);
    }

    async fn handle_delete(&self, id: String, force: bool) -> Result<()> {
        let user = self.current_user()?;
        let note = self.services.notes.get_note(&user, &id).await?;

        if !force {
            println!("You are about to delete the following note:");
            println!("ID:      {}", note.id);
            println!("Title:   {}", note.title);
            println!("Created: {}", Self::format_timestamp(&note));

            println!("\nThis action cannot be undone!");
            print!("Are you sure you want to delete this note? [y/N]: ");
            stdout().flush()?;

            let mut input = String::new();
            stdin().read_line(&mut input)?;

            let input = input.trim().to_lowercase();
            if input != "y" && input != "yes" {
                println!("Deletion cancelled.");
                return Ok(());
            }
        }

        let notes = self.services.notes.clone();
        self.track("Deleting note", async move { notes.delete_note(&user, &id).await })
            .await?;

        println!(
            "Note '{}' ({}) has been permanently deleted.",
            note.title, note.id
        );
        Ok(())
    }

    async fn handle_access(&self, code: &str, save: bool) -> Result<()> {
        let shared = self.services.sharing.access(code).await?;
        println!("Shared by {}", style(&shared.owner).bold());
        Self::print_note(&shared.note);

        if save {
            let user = self.current_user()?;
            let copy = self.services.sharing.adopt(&user, &shared).await?;
            println!("\nNote has been added to your collection with ID {}.", copy.id);
        }
        Ok(())
    }

    async fn note_for_analysis(&self, id: &str) -> Result<Note> {
        let user = self.current_user()?;
        let note = self.services.notes.get_note(&user, id).await?;
        if note.content.trim().is_empty() {
            return Err(PrepaseError::validation("Note has no content to analyze"));
        }
        debug!("Analyzing note {} ({} chars)", note.id, note.content.len());
        Ok(note)
    }

    async fn handle_detect_language(&self, id: &str) -> Result<()> {
        let note = self.note_for_analysis(id).await?;
        let analysis = self.services.analysis.clone();
        let detection = self
            .track("Detecting language", async move {
                analysis.detect_language(&note.content).await
            })
            .await?;

        println!(
            "Language: {} ({})",
            style(detection.language_name()).bold(),
            detection.language
        );
        let candidates = detection.candidates();
        if !candidates.is_empty() {
            println!("Probable languages:");
            for candidate in candidates {
                println!(
                    "  {:<12} {:<4} {:.4}",
                    candidate.name, candidate.code, candidate.probability
                );
            }
        }
        Ok(())
    }

    async fn handle_summarize(&self, id: &str) -> Result<()> {
        let note = self.note_for_analysis(id).await?;
        let analysis = self.services.analysis.clone();
        let result = self
            .track("Summarizing", async move {
                analysis.summarize_note(&note.content).await
            })
            .await?;

        println!("Language: {}", result.detection.language_name());
        println!(
            "\n{}",
            result.summary.text().unwrap_or("No summary available")
        );
        if let Some(translated) = &result.summary.translated_summary {
            println!("\n{}\n{}", style("Translated summary").bold(), translated);
        }
        Ok(())
    }

    async fn handle_keywords(&self, id: &str) -> Result<()> {
        let note = self.note_for_analysis(id).await?;
        let analysis = self.services.analysis.clone();
        let info = self
            .track("Extracting keywords", async move {
                analysis.extra_info(&note.content).await
            })
            .await?;

        if info.data.is_empty() {
            println!("No keywords found.");
        }
        for (keyword, details) in &info.data {
            let details = match details {
                serde_json::Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            println!("{}: {}", style(keyword).bold(), details);
        }
        Ok(())
    }

    async fn handle_image_to_note(
        &self,
        image: &Path,
        title: Option<String>,
        base64: bool,
    ) -> Result<()> {
        if !image.exists() {
            return Err(PrepaseError::validation(format!(
                "File not found: {}",
                image.display()
            )));
        }
        let extension = image
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_else(|| "png".to_string());
        let content_type = match extension.as_str() {
            "jpg" | "jpeg" => "image/jpeg",
            "webp" => "image/webp",
            _ => "image/png",
        };
        let object_path = unique_object_name("image", &extension);

        let objects = Arc::clone(&self.services.objects);
        let image_url = if base64 {
            let payload = fs::read_to_string(image)?;
            self.track("Uploading image", async move {
                upload_base64(objects.as_ref(), &object_path, &payload, content_type).await
            })
            .await?
        } else {
            let bytes = fs::read(image)?;
            self.track("Uploading image", async move {
                upload_bytes(objects.as_ref(), &object_path, bytes, content_type).await
            })
            .await?
        };
        println!("Uploaded to {}", image_url);

        let analysis = self.services.analysis.clone();
        let extracted = self
            .track("Extracting text", async move {
                analysis.extract_text(&image_url).await
            })
            .await?;
        println!("\n{}", extracted.extracted_text);

        if let Some(title) = title {
            let new_note = NewNote::extracted(&title, &extracted.extracted_text)?;
            self.save_note(new_note).await?;
        }
        Ok(())
    }

    async fn handle_add_font(&self, file: &Path, title: &str) -> Result<()> {
        let user = self.current_user()?;
        if title.trim().is_empty() {
            return Err(PrepaseError::validation(
                "Please enter a title for your font file",
            ));
        }
        let bytes = fs::read(file)?;
        let file_name = file
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();

        let fonts = self.services.fonts.clone();
        let title = title.to_string();
        let font = self
            .track("Adding font", async move {
                let link = fonts.upload_font(&file_name, bytes).await?;
                fonts.add_font(&user, &title, link.as_str()).await
            })
            .await?;
        println!("Font '{}' added with ID {}", font.title, style(&font.id).bold());
        Ok(())
    }

    async fn handle_list_fonts(&self) -> Result<()> {
        let user = self.current_user()?;
        let fonts = self.services.fonts.list_fonts(&user).await?;
        if fonts.is_empty() {
            println!("No fonts yet, add one with `prepase font add`.");
            return Ok(());
        }
        for font in fonts {
            println!("{}  {}", style(&font.id).dim(), style(&font.title).bold());
            println!("    {}", font.link);
        }
        Ok(())
    }

    async fn handle_handwriting(&self, id: &str, font_id: &str) -> Result<()> {
        let user = self.current_user()?;
        let note = self.note_for_analysis(id).await?;
        let font = self.services.fonts.get_font(&user, font_id).await?;

        let analysis = self.services.analysis.clone();
        let rendered = self
            .track("Generating handwriting", async move {
                analysis.generate_handwriting(&note.content, &font.link).await
            })
            .await?;
        println!("Handwriting image: {}", rendered.file_url);
        Ok(())
    }

    async fn handle_lookup(&self, word: &str) -> Result<()> {
        let dictionary = self.services.dictionary.clone();
        let word = word.to_string();
        let info = self
            .track("Looking up word", async move { dictionary.lookup(&word).await })
            .await?;

        println!("{} {}", style(&info.word).bold(), info.phonetic);
        for meaning in &info.meanings {
            println!("\n{}", style(&meaning.part_of_speech).italic());
            for (idx, definition) in meaning.definitions.iter().enumerate() {
                println!("  {}. {}", idx + 1, definition.definition);
                if let Some(example) = &definition.example {
                    println!("     \"{}\"", example);
                }
            }
        }
        if !info.synonyms.is_empty() {
            println!("\nSynonyms: {}", info.synonyms.join(", "));
        }
        if !info.antonyms.is_empty() {
            println!("Antonyms: {}", info.antonyms.join(", "));
        }
        Ok(())
    }

}

/// Handles `config show|set|reset`. Runs without any services so a broken
/// setting can always be repaired. `set` edits the stored file, leaving
/// environment and flag overrides out of it.
pub fn run_config_command(config: &Config, config_path: &Path, command: ConfigCommands) -> Result<()> {
    match command {
        ConfigCommands::Show => {
            println!("# {}", config_path.display());
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        ConfigCommands::Set { assignment } => {
            let mut stored = Config::read(config_path)?;
            stored.set(&assignment)?;
            stored.save(config_path)?;
            println!("Configuration updated.");
        }
        ConfigCommands::Reset => {
            Config::default().save(config_path)?;
            println!("Configuration reset to defaults.");
        }
    }
    Ok(())
}

/// Points `config` at a scratch data directory for an `--ephemeral` run, so
/// a session from a normal run is not picked up and `login` does not outlive
/// the process. The directory is removed when the returned guard drops.
pub fn isolate_ephemeral(config: &mut Config) -> Result<TempDir> {
    let scratch = TempDir::new()?;
    debug!("Ephemeral data directory at {}", scratch.path().display());
    config.set_data_dir(scratch.path().to_path_buf());
    Ok(scratch)
}
