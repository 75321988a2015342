//! Docker sandbox hardening: field rules and the policy that tunes them
//!
//! Every value a sandbox launcher passes to `docker run` (image, workdir,
//! user, tmpfs mounts, host aliases, DNS servers, binds, security profiles)
//! is parsed and screened here before the container is configured.

pub mod docker;
pub mod policy;

pub use docker::{
    BindMount, ContainerUser, HostEntry, Identity, SandboxDockerConfig, TmpfsMount,
    check_bind_entry, check_dns_server, check_extra_host, check_image_value, check_network_value,
    check_profile_value, check_tmpfs_entry, check_user_value, check_workdir_value,
};
pub use policy::HardeningPolicy;
