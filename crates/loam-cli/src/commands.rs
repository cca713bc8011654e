use std::borrow::Cow;
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use loam_crypto::ContentHasher;
use loam_sdk::Repository;
use loam_store::{EntryKind, StoredObject, Tree, TreeEntry};
use loam_types::{ObjectId, ObjectKind};
use serde::Serialize;

use crate::cli::*;

const AUTHOR_NAME_VAR: &str = "LOAM_AUTHOR_NAME";
const AUTHOR_EMAIL_VAR: &str = "LOAM_AUTHOR_EMAIL";

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let format = cli.format;
    match cli.command {
        Command::Init(args) => cmd_init(&init_target(&cli.dir, args.path.as_deref())),
        Command::HashObject(args) => cmd_hash_object(&cli.dir, args),
        Command::CatFile(args) => cmd_cat_file(&open_repo(&cli.dir)?, args, format),
        Command::LsTree(args) => cmd_ls_tree(&open_repo(&cli.dir)?, args, format),
        Command::WriteTree(_) => {
            let id = open_repo(&cli.dir)?.write_tree().context("failed to write tree")?;
            println!("{id}");
            Ok(())
        }
        Command::CommitTree(args) => cmd_commit_tree(&open_repo(&cli.dir)?, args),
    }
}

fn open_repo(dir: &Path) -> anyhow::Result<Repository> {
    let repo = Repository::open(dir)
        .with_context(|| format!("not a loam repository: {}", dir.display()))?;
    // Environment overrides only apply at the command layer.
    let mut identity = repo.config().user.clone();
    if let Ok(name) = env::var(AUTHOR_NAME_VAR) {
        identity.name = name;
    }
    if let Ok(email) = env::var(AUTHOR_EMAIL_VAR) {
        identity.email = email;
    }
    Ok(repo.with_identity(identity))
}

fn parse_id(text: &str) -> anyhow::Result<ObjectId> {
    text.parse::<ObjectId>()
        .with_context(|| format!("not a valid object name {text}"))
}

/// Where `init` creates the repository. A relative path is taken from `-C`.
fn init_target(dir: &Path, path: Option<&Path>) -> PathBuf {
    match path {
        Some(path) => dir.join(path),
        None => dir.to_path_buf(),
    }
}

fn cmd_init(path: &Path) -> anyhow::Result<()> {
    let repo = Repository::init(path)
        .with_context(|| format!("failed to initialize {}", path.display()))?;
    println!(
        "{} Initialized loam repository in {}",
        "✓".green().bold(),
        repo.git_dir().display().to_string().bold()
    );
    Ok(())
}

fn cmd_hash_object(dir: &Path, args: HashObjectArgs) -> anyhow::Result<()> {
    let file = dir.join(&args.file);
    let id = if args.write {
        open_repo(dir)?
            .hash_file(&file, true)
            .with_context(|| format!("could not store {}", file.display()))?
    } else {
        let data = std::fs::read(&file)
            .with_context(|| format!("could not open {} for reading", file.display()))?;
        ContentHasher::BLOB.hash(&data)
    };
    println!("{id}");
    Ok(())
}

#[derive(Serialize)]
struct ObjectSummary {
    id: ObjectId,
    kind: ObjectKind,
    size: u64,
}

fn cmd_cat_file(repo: &Repository, args: CatFileArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_id(&args.object)?;
    let obj = repo
        .cat_file(&id)
        .with_context(|| format!("failed to read object {id}"))?;

    if args.pretty {
        return pretty_print(&obj, format);
    }
    if format == OutputFormat::Json {
        let summary = ObjectSummary {
            id,
            kind: obj.kind,
            size: obj.size,
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else if args.kind {
        println!("{}", obj.kind);
    } else {
        println!("{}", obj.size);
    }
    Ok(())
}

fn pretty_print(obj: &StoredObject, format: OutputFormat) -> anyhow::Result<()> {
    match obj.kind {
        ObjectKind::Tree => print_entries(&Tree::from_stored_object(obj)?.entries, false, format),
        ObjectKind::Blob | ObjectKind::Commit => {
            let mut out = std::io::stdout().lock();
            out.write_all(&obj.payload)?;
            out.flush()?;
            Ok(())
        }
    }
}

fn cmd_ls_tree(repo: &Repository, args: LsTreeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let id = parse_id(&args.tree)?;
    let entries = repo
        .ls_tree(&id)
        .with_context(|| format!("failed to list tree {id}"))?;
    print_entries(&entries, args.name_only, format)
}

#[derive(Serialize)]
struct EntryView<'a> {
    mode: &'a str,
    kind: EntryKind,
    id: ObjectId,
    name: Cow<'a, str>,
}

fn print_entries(entries: &[TreeEntry], name_only: bool, format: OutputFormat) -> anyhow::Result<()> {
    if format == OutputFormat::Json {
        let views: Vec<_> = entries
            .iter()
            .map(|e| EntryView {
                mode: e.mode.as_str(),
                kind: e.kind(),
                id: e.object_id,
                name: e.name_lossy(),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&views)?);
        return Ok(());
    }
    for entry in entries {
        if name_only {
            println!("{}", entry.name_lossy());
        } else {
            println!("{}", format_entry(entry));
        }
    }
    Ok(())
}

/// `<mode padded to 6> <kind> <id>\t<name>`, as `git ls-tree` prints it.
fn format_entry(entry: &TreeEntry) -> String {
    format!(
        "{:0>6} {} {}\t{}",
        entry.mode.as_str(),
        entry.kind(),
        entry.object_id,
        entry.name_lossy()
    )
}

fn cmd_commit_tree(repo: &Repository, args: CommitTreeArgs) -> anyhow::Result<()> {
    let tree = parse_id(&args.tree)?;
    let parents = args
        .parents
        .iter()
        .map(|p| parse_id(p))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let id = repo
        .commit_tree(tree, &parents, &args.message)
        .with_context(|| format!("failed to commit tree {tree}"))?;
    println!("{id}");
    Ok(())
}
