//! Build procedures
//!
//! A procedure turns the directory layout and host into the parameter map
//! for a library's templates and picks the directory its commands run in.
//! Most libraries use [`BuildProcedure::Standard`]; krb5 and curl need extra
//! parameters. The table mapping libraries to procedures is built once from
//! the registry.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::core::layout::DirLayout;
use crate::core::platform::{HostPlatform, PlatformFamily};
use crate::core::template::ParamMap;
use crate::registry::{LibraryId, Registry};

/// macOS SDK used for curl's `-isysroot`
pub const MACOS_SYSROOT: &str = "/Library/Developer/CommandLineTools/SDKs/MacOSX.sdk";

/// Minimum macOS version curl is compiled for
pub const MACOS_DEPLOYMENT_TARGET: &str = "10.8";

/// Static archives curl links against on Linux, relative to the install root
const CURL_LINUX_ARCHIVES: &[&str] = &[
    "krb5/lib/libkrb5.a",
    "krb5/lib/libgssapi_krb5.a",
    "krb5/lib/libk5crypto.a",
    "krb5/lib/libkrb5support.a",
    "krb5/lib/libcom_err.a",
    "krb5/lib/libgssrpc.a",
    "krb5/lib/libkadm5clnt.a",
    "krb5/lib/libkadm5srv.a",
    "krb5/lib/libkdb5.a",
    "krb5/lib/libkrad.a",
    "krb5/lib/libverto.a",
    "nghttp2/lib/libnghttp2.a",
    "openssl/lib/libssl.a",
    "openssl/lib/libcrypto.a",
    "zlib/lib/libz.a",
];

/// Libraries whose headers curl compiles against
const CURL_INCLUDE_LIBS: &[&str] = &["nghttp2", "openssl", "cares", "zlib", "krb5"];

/// How parameters are derived for a library
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildProcedure {
    /// Common parameters, commands run in the source tree
    #[default]
    Standard,
    /// Adds `options`, commands run in `<src>/src`
    Krb5,
    /// Adds compiler and linker flags pointing at sibling installs
    Curl,
}

/// Run-wide inputs shared by every procedure
#[derive(Debug, Clone)]
pub struct BuildContext<'a> {
    pub layout: &'a DirLayout,
    pub host: HostPlatform,
    pub cmake_command: &'a str,
    pub jobs: usize,
}

/// Parameters and working directory for one library's commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBuild {
    pub params: ParamMap,
    pub working_dir: PathBuf,
}

impl BuildProcedure {
    /// Derive the parameters for `id`
    pub fn prepare(self, id: &LibraryId, ctx: &BuildContext<'_>) -> PreparedBuild {
        let mut params = common_params(id, ctx);
        let src_dir = ctx.layout.source_dir(id);

        let working_dir = match self {
            Self::Standard => src_dir,
            Self::Krb5 => {
                params.insert("options", krb5_options(&ctx.layout.install_dir(id)));
                src_dir.join("src")
            }
            Self::Curl => {
                let flags = curl_flags(&ctx.layout.install_dir_parent(id), &ctx.host);
                for (key, value) in flags.iter() {
                    params.insert(key, value);
                }
                src_dir
            }
        };

        PreparedBuild {
            params,
            working_dir,
        }
    }
}

/// Parameters every library receives
fn common_params(id: &LibraryId, ctx: &BuildContext<'_>) -> ParamMap {
    let layout = ctx.layout;
    let mut params = ParamMap::new();
    params.insert_path("install_dir", &layout.install_dir(id));
    params.insert_path("install_dir_parent", &layout.install_dir_parent(id));
    params.insert_path("build_dir", &layout.build_dir(id));
    params.insert_path("src_dir", &layout.source_dir(id));
    params.insert("cmake_command", ctx.cmake_command);
    params.insert("build_type", layout.build_type.to_string());
    params.insert("jobs", ctx.jobs.to_string());
    match ctx.host.openssl_platform() {
        Ok(target) => params.insert("openssl_platform", target),
        Err(e) => tracing::warn!("No openssl_platform parameter: {e}"),
    }
    params
}

fn krb5_options(install_dir: &Path) -> String {
    format!(
        "--prefix={} --with-tcl=no --without-system-verto \
         --enable-dns-for-realm --with-crypto-impl=builtin",
        install_dir.display()
    )
}

/// `CPPFLAGS_`, `LDFLAGS_`, `LIBS_` and `EXTRAS_` for curl's configure
fn curl_flags(install_parent: &Path, host: &HostPlatform) -> ParamMap {
    let root = install_parent.display();
    let mut cppflags = CURL_INCLUDE_LIBS
        .iter()
        .map(|lib| format!("-I{root}/{lib}/include"))
        .collect::<Vec<_>>()
        .join(" ");
    let mut ldflags = String::new();
    let mut libs = String::new();
    let mut extras = String::new();

    match host.family {
        PlatformFamily::MacOs => {
            cppflags.push_str(&format!(
                " -arch {} -isysroot {MACOS_SYSROOT} -mmacosx-version-min={MACOS_DEPLOYMENT_TARGET} ",
                host.apple_arch()
            ));
            extras = format!(
                " CC=clang --host={} --with-secure-transport ",
                host.apple_host_triple()
            );
            libs = " -lresolv -lkrb5 -lk5crypto -lkrb5support -lcom_err ".to_string();
            ldflags = " -framework Kerberos ".to_string();
        }
        PlatformFamily::Linux => {
            let archives = CURL_LINUX_ARCHIVES
                .iter()
                .map(|a| format!("{root}/{a}"))
                .collect::<Vec<_>>()
                .join(" ");
            libs = format!("{archives} -lresolv -lkeyutils -ldl -pthread");
        }
        PlatformFamily::Windows => {}
    }

    let mut flags = ParamMap::new();
    flags.insert("CPPFLAGS_", quoted_flag("CPPFLAGS", &cppflags));
    flags.insert("LDFLAGS_", quoted_flag("LDFLAGS", &ldflags));
    flags.insert("LIBS_", quoted_flag("LIBS", &libs));
    flags.insert("EXTRAS_", extras);
    flags
}

/// `NAME='value'`, or nothing for an empty value
fn quoted_flag(name: &str, value: &str) -> String {
    if value.is_empty() {
        String::new()
    } else {
        format!("{name}='{value}'")
    }
}

/// Closed mapping from library to build procedure
#[derive(Debug, Clone, Default)]
pub struct ProcedureTable {
    entries: HashMap<LibraryId, BuildProcedure>,
}

impl ProcedureTable {
    /// Populate the table from the registry
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            entries: registry
                .iter()
                .map(|record| (record.id.clone(), record.procedure))
                .collect(),
        }
    }

    /// Procedure for a library; unknown libraries use the standard one
    pub fn procedure_for(&self, id: &LibraryId) -> BuildProcedure {
        self.entries.get(id).copied().unwrap_or_default()
    }

    /// Derive parameters for a library
    pub fn prepare(&self, id: &LibraryId, ctx: &BuildContext<'_>) -> PreparedBuild {
        self.procedure_for(id).prepare(id, ctx)
    }
}
