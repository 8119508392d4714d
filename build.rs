use vergen::{BuildBuilder, Emitter, RustcBuilder};
use vergen_git2::Git2Builder;

// Emits VERGEN_BUILD_TIMESTAMP, VERGEN_RUSTC_SEMVER and VERGEN_GIT_SHA for
// `jiuding --version`.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = BuildBuilder::default().build_timestamp(true).build()?;
    let rustc = RustcBuilder::default().semver(true).build()?;
    let mut emitter = Emitter::default();
    emitter.add_instructions(&build)?.add_instructions(&rustc)?;

    // Source tarballs have no git metadata.
    match Git2Builder::default().sha(true).build() {
        Ok(git2) => {
            emitter.add_instructions(&git2)?;
        }
        Err(_) => println!("cargo:rustc-env=VERGEN_GIT_SHA=unknown"),
    }

    emitter.emit()?;
    Ok(())
}
