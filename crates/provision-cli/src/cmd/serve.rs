use std::path::Path;

use super::load_config;

pub fn run(root: &Path, port: u16) -> anyhow::Result<()> {
    load_config(root)?;
    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(provision_server::serve(root.to_path_buf(), port))
}
