use clap::{Parser, Subcommand};
use std::path::Path;
use std::process::{Command, ExitCode};

/// eBPF 프로그램 디렉토리 (workspace 루트 기준)
const EBPF_DIR: &str = "crates/ebpf-engine/ebpf";
/// 커널 프로그램 빌드 타겟
const BPF_TARGET: &str = "bpfel-unknown-none";
/// 산출물 이름 (`[[bin]] name`)
const EBPF_BIN: &str = "udpfilter-ebpf";

/// udpfilter 빌드 태스크
#[derive(Parser)]
#[command(name = "xtask")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// eBPF 커널 프로그램 빌드
    BuildEbpf {
        /// 릴리스 모드로 빌드
        #[arg(long)]
        release: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.command {
        Commands::BuildEbpf { release } => build_ebpf(release),
    }
}

fn build_ebpf(release: bool) -> ExitCode {
    // workspace target/ 아래에 두어 xdp.program_path 기본값과 맞춤
    let target_dir = Path::new("target");
    let target_dir_arg = format!(
        "--target-dir={}",
        Path::new("../../..").join(target_dir).display()
    );

    let mut cmd = Command::new("cargo");
    cmd.current_dir(EBPF_DIR);

    cmd.args(["+nightly", "build", "-Z", "build-std=core"])
        .arg(format!("--target={BPF_TARGET}"))
        .arg(target_dir_arg);

    if release {
        cmd.arg("--release");
    }

    let status = match cmd.status() {
        Ok(status) => status,
        Err(e) => {
            eprintln!("failed to run cargo for eBPF build: {e}");
            return ExitCode::FAILURE;
        }
    };
    if !status.success() {
        eprintln!("eBPF build failed");
        return ExitCode::FAILURE;
    }

    let profile = if release { "release" } else { "debug" };
    let artifact = target_dir.join(BPF_TARGET).join(profile).join(EBPF_BIN);
    println!("eBPF build succeeded: {}", artifact.display());
    ExitCode::SUCCESS
}
