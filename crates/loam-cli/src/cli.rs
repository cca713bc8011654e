use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "loam",
    about = "loam: content-addressed object store in git's loose-object format",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Run as if started in this directory
    #[arg(short = 'C', global = true, default_value = ".")]
    pub dir: PathBuf,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Create an empty object database
    Init(InitArgs),
    /// Compute a blob id for a file, optionally storing it
    HashObject(HashObjectArgs),
    /// Show an object's content, kind or size
    CatFile(CatFileArgs),
    /// List the entries of a tree object
    LsTree(LsTreeArgs),
    /// Snapshot the working directory as a tree object
    WriteTree(WriteTreeArgs),
    /// Create a commit object for a tree
    CommitTree(CommitTreeArgs),
}

#[derive(Args)]
pub struct InitArgs {
    pub path: Option<PathBuf>,
}

#[derive(Args)]
pub struct HashObjectArgs {
    /// Write the object into the database
    #[arg(short = 'w')]
    pub write: bool,
    pub file: PathBuf,
}

#[derive(Args)]
#[command(group(ArgGroup::new("mode").required(true).args(["pretty", "kind", "size"])))]
pub struct CatFileArgs {
    /// Pretty-print the object's content
    #[arg(short = 'p')]
    pub pretty: bool,
    /// Show the object's kind
    #[arg(short = 't')]
    pub kind: bool,
    /// Show the object's payload size
    #[arg(short = 's')]
    pub size: bool,
    pub object: String,
}

#[derive(Args)]
pub struct LsTreeArgs {
    #[arg(long)]
    pub name_only: bool,
    pub tree: String,
}

#[derive(Args)]
pub struct WriteTreeArgs {}

#[derive(Args)]
pub struct CommitTreeArgs {
    pub tree: String,
    /// Parent commit (repeatable, order is kept)
    #[arg(short = 'p')]
    pub parents: Vec<String>,
    #[arg(short = 'm', required = true)]
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "ce013625030ba8dba906f756967f9e9ca394464a";

    #[test]
    fn parse_init() {
        let cli = Cli::try_parse_from(["loam", "init"]).unwrap();
        assert!(matches!(cli.command, Command::Init(InitArgs { path: None })));
        assert_eq!(cli.dir, PathBuf::from("."));
    }

    #[test]
    fn parse_init_with_path() {
        let cli = Cli::try_parse_from(["loam", "init", "/tmp/repo"]).unwrap();
        if let Command::Init(args) = cli.command {
            assert_eq!(args.path, Some(PathBuf::from("/tmp/repo")));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_hash_object_write() {
        let cli = Cli::try_parse_from(["loam", "hash-object", "-w", "file.txt"]).unwrap();
        if let Command::HashObject(args) = cli.command {
            assert!(args.write);
            assert_eq!(args.file, PathBuf::from("file.txt"));
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_cat_file_modes() {
        let cli = Cli::try_parse_from(["loam", "cat-file", "-p", ID]).unwrap();
        if let Command::CatFile(args) = cli.command {
            assert!(args.pretty && !args.kind && !args.size);
            assert_eq!(args.object, ID);
        } else { panic!("wrong command"); }

        let cli = Cli::try_parse_from(["loam", "cat-file", "-t", ID]).unwrap();
        assert!(matches!(cli.command, Command::CatFile(CatFileArgs { kind: true, .. })));
    }

    #[test]
    fn cat_file_requires_exactly_one_mode() {
        assert!(Cli::try_parse_from(["loam", "cat-file", ID]).is_err());
        assert!(Cli::try_parse_from(["loam", "cat-file", "-p", "-t", ID]).is_err());
    }

    #[test]
    fn parse_ls_tree_name_only() {
        let cli = Cli::try_parse_from(["loam", "ls-tree", "--name-only", ID]).unwrap();
        if let Command::LsTree(args) = cli.command {
            assert!(args.name_only);
            assert_eq!(args.tree, ID);
        } else { panic!("wrong command"); }
    }

    #[test]
    fn parse_write_tree() {
        let cli = Cli::try_parse_from(["loam", "write-tree"]).unwrap();
        assert!(matches!(cli.command, Command::WriteTree(_)));
    }

    #[test]
    fn parse_commit_tree_with_parents() {
        let cli = Cli::try_parse_from([
            "loam", "commit-tree", ID, "-p", "aaa", "-p", "bbb", "-m", "msg",
        ])
        .unwrap();
        if let Command::CommitTree(args) = cli.command {
            assert_eq!(args.tree, ID);
            assert_eq!(args.parents, vec!["aaa", "bbb"]);
            assert_eq!(args.message, "msg");
        } else { panic!("wrong command"); }
    }

    #[test]
    fn commit_tree_requires_message() {
        assert!(Cli::try_parse_from(["loam", "commit-tree", ID]).is_err());
    }

    #[test]
    fn parse_global_flags() {
        let cli = Cli::try_parse_from([
            "loam", "--verbose", "--format", "json", "-C", "/work", "write-tree",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
        assert_eq!(cli.dir, PathBuf::from("/work"));
    }
}
