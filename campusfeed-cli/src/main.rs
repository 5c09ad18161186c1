//! campusfeed - command-line client for the CampusFeed service

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::debug;

use libcampusfeed::auth::AuthService;
use libcampusfeed::backend::rest::RestBackend;
use libcampusfeed::error::AuthError;
use libcampusfeed::feed::FeedService;
use libcampusfeed::profile::ProfileService;
use libcampusfeed::render::render;
use libcampusfeed::session::SessionStore;
use libcampusfeed::{
    AttachmentKind, CampusfeedError, Composer, Config, Identity, LocalFile, Profile, Result,
};

#[derive(Parser, Debug)]
#[command(name = "campusfeed")]
#[command(about = "Client for the CampusFeed social feed", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new account
    Signup {
        email: String,
        /// Display name for the profile
        full_name: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    /// Sign in
    Login {
        email: String,
        #[arg(long)]
        password: String,
    },
    /// Sign out and discard the stored session
    Logout,
    /// Show the feed, newest first
    Feed,
    /// Publish a new post
    Post {
        /// Post text (optional when attachments are given)
        content: Option<String>,
        /// Image attachment paths, in gallery order
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Video attachment path
        #[arg(long)]
        video: Option<PathBuf>,
        /// File attachment path
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Edit one of your posts in place
    Edit {
        post_id: String,
        /// Replacement text (keeps the existing text when omitted)
        content: Option<String>,
        /// Replacement images (existing attachments are kept when no new
        /// attachments are staged)
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        #[arg(long)]
        video: Option<PathBuf>,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Delete one of your posts (irreversible)
    Delete {
        post_id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show or edit your profile
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
}

#[derive(Subcommand, Debug)]
enum ProfileAction {
    /// Display the stored profile
    Show,
    /// Update profile fields; omitted fields keep their current value
    Edit {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        nickname: Option<String>,
        #[arg(long)]
        age: Option<u32>,
        #[arg(long)]
        gender: Option<String>,
        #[arg(long)]
        department: Option<String>,
        #[arg(long)]
        class: Option<String>,
        #[arg(long)]
        section: Option<String>,
        #[arg(long)]
        hobby: Option<String>,
        #[arg(long)]
        bio: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.verbose {
        tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_writer(std::io::stderr)
            .init();
    } else {
        libcampusfeed::logging::init_default();
    }

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

struct App {
    backend: Arc<RestBackend>,
    sessions: SessionStore,
}

impl App {
    fn open() -> Result<Self> {
        let config = match Config::load() {
            Ok(config) => config,
            Err(e) => {
                debug!("no config file ({}), using defaults", e);
                Config::default_config()
            }
        };

        let backend = Arc::new(RestBackend::new(&config.backend)?);
        let sessions = SessionStore::open_default()?;
        if let Some(session) = sessions.load()? {
            backend.restore_session(session);
        }

        Ok(Self { backend, sessions })
    }

    fn auth(&self) -> AuthService {
        AuthService::new(self.backend.clone(), self.backend.clone())
    }

    fn feed(&self) -> FeedService {
        FeedService::new(self.backend.clone())
    }

    fn profiles(&self) -> ProfileService {
        ProfileService::new(self.backend.clone())
    }

    async fn require_viewer(&self) -> Result<Identity> {
        self.auth().current_user().await?.ok_or_else(|| {
            AuthError::NotSignedIn("run `campusfeed login` first".to_string()).into()
        })
    }

    async fn print_feed(&self, viewer: &Identity) -> Result<()> {
        let entries = self.feed().load().await?;
        if entries.is_empty() {
            println!("No posts yet. Be the first to post!");
            return Ok(());
        }
        for entry in &entries {
            print!("{}", render(entry, &viewer.id).to_text());
            println!();
        }
        Ok(())
    }
}

fn stage_from_paths(
    composer: &mut Composer,
    images: &[PathBuf],
    video: Option<&PathBuf>,
    file: Option<&PathBuf>,
) -> Result<()> {
    let read = |path: &PathBuf| {
        LocalFile::from_path(path).map_err(|e| {
            CampusfeedError::InvalidInput(format!("Cannot read {}: {}", path.display(), e))
        })
    };

    if !images.is_empty() {
        let files = images.iter().map(read).collect::<Result<Vec<_>>>()?;
        composer.stage(AttachmentKind::Image, files);
    }
    if let Some(path) = video {
        composer.stage(AttachmentKind::Video, vec![read(path)?]);
    }
    if let Some(path) = file {
        composer.stage(AttachmentKind::File, vec![read(path)?]);
    }
    Ok(())
}

fn confirm_delete(post_id: &str) -> Result<bool> {
    print!(
        "Delete post {}? This cannot be undone. [y/N] ",
        post_id
    );
    std::io::stdout()
        .flush()
        .map_err(|e| CampusfeedError::InvalidInput(e.to_string()))?;

    let mut answer = String::new();
    std::io::stdin()
        .read_line(&mut answer)
        .map_err(|e| CampusfeedError::InvalidInput(e.to_string()))?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}

fn print_field(label: &str, value: Option<&str>) {
    println!("{:<12} {}", label, value.filter(|v| !v.is_empty()).unwrap_or("Not set"));
}

async fn run(cli: Cli) -> Result<()> {
    let app = App::open()?;

    match cli.command {
        Command::Signup {
            email,
            full_name,
            password,
            confirm_password,
        } => {
            let session = app
                .auth()
                .sign_up(&email, &password, &confirm_password, &full_name)
                .await?;
            if session.is_usable() {
                app.sessions.save(&session)?;
                println!("Account created. You are signed in as {}.", email);
            } else {
                println!("Account created. Check your email to verify it, then log in.");
            }
        }
        Command::Login { email, password } => {
            let session = app.auth().sign_in(&email, &password).await?;
            app.sessions.save(&session)?;
            println!("Signed in as {}.", session.user.email);
        }
        Command::Logout => {
            app.auth().sign_out().await?;
            app.sessions.clear()?;
            println!("Signed out.");
        }
        Command::Feed => {
            let viewer = app.require_viewer().await?;
            app.print_feed(&viewer).await?;
        }
        Command::Post {
            content,
            images,
            video,
            file,
        } => {
            let viewer = app.require_viewer().await?;
            let mut composer = Composer::new();
            composer.set_content(content.unwrap_or_default());
            stage_from_paths(&mut composer, &images, video.as_ref(), file.as_ref())?;

            let post = composer
                .submit(&viewer, app.backend.as_ref(), app.backend.as_ref())
                .await?;
            println!("Posted {}.", post.id);
            app.print_feed(&viewer).await?;
        }
        Command::Edit {
            post_id,
            content,
            images,
            video,
            file,
        } => {
            let viewer = app.require_viewer().await?;
            let target = app.feed().get(&post_id).await?;

            let mut composer = Composer::new();
            composer.begin_edit(&target)?;
            if let Some(content) = content {
                composer.set_content(content);
            }
            stage_from_paths(&mut composer, &images, video.as_ref(), file.as_ref())?;

            let post = composer
                .submit(&viewer, app.backend.as_ref(), app.backend.as_ref())
                .await?;
            println!("Updated {}.", post.id);
            app.print_feed(&viewer).await?;
        }
        Command::Delete { post_id, yes } => {
            let viewer = app.require_viewer().await?;
            if !yes && !confirm_delete(&post_id)? {
                println!("Aborted.");
                return Ok(());
            }
            app.feed().delete(&post_id, &viewer).await?;
            println!("Deleted {}.", post_id);
            app.print_feed(&viewer).await?;
        }
        Command::Profile { action } => {
            let viewer = app.require_viewer().await?;
            let profiles = app.profiles();

            match action {
                ProfileAction::Show => {
                    let profile = profiles.load(&viewer).await?;
                    let name = profile.full_name.as_deref().unwrap_or("U");
                    println!("[{}]", libcampusfeed::render::initials(name));
                    print_field("Name", profile.full_name.as_deref());
                    print_field("Email", Some(viewer.email.as_str()));
                    print_field("Nickname", profile.nickname.as_deref());
                    print_field("Age", profile.age.map(|a| a.to_string()).as_deref());
                    print_field("Gender", profile.gender.as_deref());
                    print_field("Department", profile.department.as_deref());
                    print_field("Class", profile.class.as_deref());
                    print_field("Section", profile.section.as_deref());
                    print_field("Hobby", profile.hobby.as_deref());
                    print_field("Bio", profile.bio.as_deref());
                }
                ProfileAction::Edit {
                    full_name,
                    nickname,
                    age,
                    gender,
                    department,
                    class,
                    section,
                    hobby,
                    bio,
                } => {
                    // Start from the stored profile, overlay the provided
                    // fields, and save the whole record
                    let current = profiles.load(&viewer).await?;
                    let updated = Profile {
                        id: viewer.id.clone(),
                        full_name: full_name.or(current.full_name),
                        nickname: nickname.or(current.nickname),
                        age: age.or(current.age),
                        gender: gender.or(current.gender),
                        department: department.or(current.department),
                        class: class.or(current.class),
                        section: section.or(current.section),
                        hobby: hobby.or(current.hobby),
                        bio: bio.or(current.bio),
                    };
                    profiles.save(&viewer, updated).await?;
                    println!("Profile updated.");
                }
            }
        }
    }

    Ok(())
}
