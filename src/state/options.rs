//! `set -o ...` and `shopt -s ...` toggles (spec §4.G `set`/`shopt`).

/// POSIX-ish options toggled by `set -X` / `set -o NAME`.
#[derive(Debug, Clone)]
pub struct ShellOptions {
    pub errexit: bool,
    pub nounset: bool,
    pub xtrace: bool,
    pub verbose: bool,
    pub noglob: bool,
    pub noclobber: bool,
    pub noexec: bool,
    pub pipefail: bool,
    pub posix: bool,
    pub allexport: bool,
    pub monitor: bool,
    pub notify: bool,
    pub errtrace: bool,
    pub functrace: bool,
    pub ignoreeof: bool,
    pub hashall: bool,
    pub physical: bool,
    pub privileged: bool,
    pub restricted: bool,
    pub interactive_comments: bool,
}

impl Default for ShellOptions {
    fn default() -> Self {
        Self {
            errexit: false,
            nounset: false,
            xtrace: false,
            verbose: false,
            noglob: false,
            noclobber: false,
            noexec: false,
            pipefail: false,
            posix: false,
            allexport: false,
            monitor: false,
            notify: false,
            errtrace: false,
            functrace: false,
            ignoreeof: false,
            hashall: true,
            physical: false,
            privileged: false,
            restricted: false,
            interactive_comments: true,
        }
    }
}

impl ShellOptions {
    /// `set -o name` / `set +o name` name table, used by both `set -o`
    /// listing and `set -o NAME` lookups.
    pub fn get_by_name(&self, name: &str) -> Option<bool> {
        Some(match name {
            "errexit" => self.errexit,
            "nounset" => self.nounset,
            "xtrace" => self.xtrace,
            "verbose" => self.verbose,
            "noglob" => self.noglob,
            "noclobber" => self.noclobber,
            "noexec" => self.noexec,
            "pipefail" => self.pipefail,
            "posix" => self.posix,
            "allexport" => self.allexport,
            "monitor" => self.monitor,
            "notify" => self.notify,
            "errtrace" => self.errtrace,
            "functrace" => self.functrace,
            "ignoreeof" => self.ignoreeof,
            "hashall" => self.hashall,
            "physical" => self.physical,
            "privileged" => self.privileged,
            "restricted" => self.restricted,
            _ => return None,
        })
    }

    pub fn set_by_name(&mut self, name: &str, value: bool) -> bool {
        match name {
            "errexit" => self.errexit = value,
            "nounset" => self.nounset = value,
            "xtrace" => self.xtrace = value,
            "verbose" => self.verbose = value,
            "noglob" => self.noglob = value,
            "noclobber" => self.noclobber = value,
            "noexec" => self.noexec = value,
            "pipefail" => self.pipefail = value,
            "posix" => self.posix = value,
            "allexport" => self.allexport = value,
            "monitor" => self.monitor = value,
            "notify" => self.notify = value,
            "errtrace" => self.errtrace = value,
            "functrace" => self.functrace = value,
            "ignoreeof" => self.ignoreeof = value,
            "hashall" => self.hashall = value,
            "physical" => self.physical = value,
            "privileged" => self.privileged = value,
            "restricted" => self.restricted = value,
            _ => return false,
        }
        true
    }

    pub fn names() -> &'static [&'static str] {
        &[
            "errexit", "nounset", "xtrace", "verbose", "noglob", "noclobber",
            "noexec", "pipefail", "posix", "allexport", "monitor", "notify",
            "errtrace", "functrace", "ignoreeof", "hashall", "physical",
            "privileged", "restricted",
        ]
    }
}

/// `shopt` options (spec §4.E/§4.G `shopt`).
#[derive(Debug, Clone)]
pub struct ShoptOptions {
    pub extglob: bool,
    pub dotglob: bool,
    pub nullglob: bool,
    pub failglob: bool,
    pub globstar: bool,
    pub nocaseglob: bool,
    pub nocasematch: bool,
    pub expand_aliases: bool,
    pub sourcepath: bool,
    pub autocd: bool,
    pub cdspell: bool,
    pub checkwinsize: bool,
    pub lastpipe: bool,
    pub huponexit: bool,
}

impl Default for ShoptOptions {
    fn default() -> Self {
        Self {
            extglob: false,
            dotglob: false,
            nullglob: false,
            failglob: false,
            globstar: false,
            nocaseglob: false,
            nocasematch: false,
            expand_aliases: true,
            sourcepath: true,
            autocd: false,
            cdspell: false,
            checkwinsize: true,
            lastpipe: false,
            huponexit: false,
        }
    }
}

impl ShoptOptions {
    pub fn get_by_name(&self, name: &str) -> Option<bool> {
        Some(match name {
            "extglob" => self.extglob,
            "dotglob" => self.dotglob,
            "nullglob" => self.nullglob,
            "failglob" => self.failglob,
            "globstar" => self.globstar,
            "nocaseglob" => self.nocaseglob,
            "nocasematch" => self.nocasematch,
            "expand_aliases" => self.expand_aliases,
            "sourcepath" => self.sourcepath,
            "autocd" => self.autocd,
            "cdspell" => self.cdspell,
            "checkwinsize" => self.checkwinsize,
            "lastpipe" => self.lastpipe,
            "huponexit" => self.huponexit,
            _ => return None,
        })
    }

    pub fn set_by_name(&mut self, name: &str, value: bool) -> bool {
        match name {
            "extglob" => self.extglob = value,
            "dotglob" => self.dotglob = value,
            "nullglob" => self.nullglob = value,
            "failglob" => self.failglob = value,
            "globstar" => self.globstar = value,
            "nocaseglob" => self.nocaseglob = value,
            "nocasematch" => self.nocasematch = value,
            "expand_aliases" => self.expand_aliases = value,
            "sourcepath" => self.sourcepath = value,
            "autocd" => self.autocd = value,
            "cdspell" => self.cdspell = value,
            "checkwinsize" => self.checkwinsize = value,
            "lastpipe" => self.lastpipe = value,
            "huponexit" => self.huponexit = value,
            _ => return false,
        }
        true
    }

    pub fn names() -> &'static [&'static str] {
        &[
            "extglob", "dotglob", "nullglob", "failglob", "globstar",
            "nocaseglob", "nocasematch", "expand_aliases", "sourcepath",
            "autocd", "cdspell", "checkwinsize", "lastpipe", "huponexit",
        ]
    }
}
