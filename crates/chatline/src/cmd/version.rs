use crate::cmd::VersionArgs;
use crate::exit::{CliResult, SUCCESS};

pub fn run(args: VersionArgs) -> CliResult<i32> {
    if !args.extended {
        println!("chatline {}", env!("CARGO_PKG_VERSION"));
        return Ok(SUCCESS);
    }

    println!("name: chatline");
    println!("version: {}", env!("CARGO_PKG_VERSION"));
    println!("target_os: {}", std::env::consts::OS);
    println!("target_arch: {}", std::env::consts::ARCH);
    println!(
        "build_target: {}",
        option_env!("CHATLINE_BUILD_TARGET").unwrap_or("unknown")
    );
    println!(
        "features: client={}, async={}, cli=true",
        cfg!(feature = "client"),
        cfg!(feature = "async")
    );

    Ok(SUCCESS)
}
