pub mod defaults {
    pub const RUNPATH_FORMAT: &str = "simulations/realization-%d/iter-%d";
    pub const BASENAME_FORMAT: &str = "CASE_%d";
    pub const EXPORT_FILE: &str = "runpath_list.txt";
    pub const CONFIG_FILE: &str = "resim.toml";
}

pub mod substitution {
    pub const REALIZATION: &str = "<IENS>";
    pub const ITERATION: &str = "<ITER>";
    pub const RUNPATH: &str = "<RUNPATH>";
    pub const BASENAME: &str = "<ECLBASE>";
}

pub mod env {
    pub const LOG_LEVEL: &str = "RESIM_LOG_LEVEL";
    pub const LOG_TEE: &str = "RESIM_TEST_LOG_TEE";
}
