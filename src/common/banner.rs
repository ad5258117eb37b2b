const GREEN: &str = "\x1b[32m";
const CYAN: &str = "\x1b[36m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";
const DIM: &str = "\x1b[2m";

macro_rules! env_or {
    ($key:literal, $default:literal) => {
        option_env!($key).unwrap_or($default)
    };
}

pub struct BannerInfo {
    pub version: &'static str,
    pub branch: &'static str,
    pub commit: &'static str,
    pub profile: &'static str,
}

impl Default for BannerInfo {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION"),
            branch: env_or!("GIT_BRANCH", "unknown"),
            commit: env_or!("GIT_COMMIT", "unknown"),
            profile: if cfg!(debug_assertions) {
                "debug"
            } else {
                "release"
            },
        }
    }
}

pub fn print_banner(info: &BannerInfo) {
    println!();
    println!("{GREEN}   _____                  __  ___           __              {RESET}");
    println!("{GREEN}  / ___/____  ____  ____ /  |/  /___ ______/ /___  ______   {RESET}");
    println!("{GREEN}  \\__ \\/ __ \\/ __ \\/ __ `/ /|_/ / __ `/ ___/ __/ / / / __ \\  {RESET}");
    println!("{GREEN} ___/ / /_/ / / / / /_/ / /  / / /_/ / /  / /_/ /_/ / / / /  {RESET}");
    println!("{GREEN}/____/\\____/_/ /_/\\__, /_/  /_/\\__,_/_/   \\__/\\__, /_/ /_/   {RESET}");
    println!("{GREEN}                 /____/                      /____/          {RESET}");
    println!("{DIM}============================================{RESET}");
    println!();

    print_row("Version", info.version, CYAN);
    print_row("Branch", info.branch, RESET);

    let commit_short = if info.commit.len() > 8 {
        &info.commit[..8]
    } else {
        info.commit
    };
    print_row_owned("Commit", commit_short);
    print_row("Profile", info.profile, YELLOW);

    println!();
}

fn print_row(label: &str, value: &'static str, color: &str) {
    println!("  {BOLD}{label:<14}{RESET}{color}{value}{RESET}");
}

fn print_row_owned(label: &str, value: &str) {
    println!("  {BOLD}{label:<14}{RESET}{value}");
}
