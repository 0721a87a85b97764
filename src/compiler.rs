use crate::types::CompilationUnit;
use ethers_solc::{
    artifacts::{output_selection::OutputSelection, BytecodeObject, Severity, Sources},
    error::SolcError,
    CompilerInput, Solc,
};
use std::{
    fmt::{self, Display, Formatter},
    str::FromStr,
};
use thiserror::Error;

/// Long solc version, e.g. `v0.8.24+commit.e11b9ed9`. The full form is what
/// explorers match during verification; `short()` is what svm installs by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version(semver::Version);

impl Version {
    pub fn short(&self) -> String {
        format!("{}.{}.{}", self.0.major, self.0.minor, self.0.patch)
    }
}

impl FromStr for Version {
    type Err = semver::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(semver::Version::from_str(s.trim_start_matches('v'))?))
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "v{}", self.0)
    }
}

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("error while fetching compiler: {0}")]
    Install(SolcError),
    #[error("internal error while compiling: {0}")]
    Solc(#[from] SolcError),
    #[error("compilation error: {0}")]
    Compilation(String),
    #[error("contract {0} is missing from compiler output")]
    ContractMissing(String),
    #[error("bytecode of {0} contains unlinked library references")]
    UnlinkedBytecode(String),
    #[error("invalid bytecode: {0}")]
    InvalidBytecode(String),
}

/// Builds the compiler request document: optimizer on with 200 runs and the
/// complete output selection.
pub fn standard_json_input(sources: Sources) -> CompilerInput {
    let mut settings = ethers_solc::artifacts::Settings::default();
    settings.optimizer.enabled = Some(true);
    settings.optimizer.runs = Some(200);
    settings.output_selection = OutputSelection::complete_output_selection();
    settings.evm_version = None;
    CompilerInput {
        language: "Solidity".to_string(),
        sources,
        settings,
    }
}

/// Canonical `.sol` file name for a contract: path-unsafe characters are
/// stripped and the `.sol` suffix is guaranteed.
pub fn contract_file_name(contract_name: &str) -> String {
    let sanitized: String = contract_name
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':') && !c.is_whitespace())
        .collect();
    let base = if sanitized.is_empty() {
        "Contract".to_string()
    } else {
        sanitized
    };
    if base.ends_with(".sol") {
        base
    } else {
        format!("{base}.sol")
    }
}

fn normalize_bytecode(bytecode: &str) -> String {
    format!("0x{}", bytecode.trim_start_matches("0x"))
}

pub struct SolcCompiler {
    version: Version,
}

impl SolcCompiler {
    pub fn new(version: Version) -> Self {
        Self { version }
    }

    pub fn version(&self) -> &Version {
        &self.version
    }

    /// Compiles the source map and extracts ABI and creation bytecode of
    /// `contract_name`. Deterministic for identical inputs; no network calls
    /// beyond the one-time compiler binary installation.
    pub async fn compile(
        &self,
        contract_name: &str,
        sources: Sources,
    ) -> Result<CompilationUnit, CompileError> {
        let input = standard_json_input(sources.clone());
        let solc =
            Solc::find_or_install_svm_version(self.version.short()).map_err(CompileError::Install)?;
        let output = solc.compile(&input)?;

        // Errors, warnings and infos all arrive in `output.errors`; only
        // error severity aborts the compilation.
        let error = output
            .errors
            .iter()
            .find(|err| err.severity == Severity::Error)
            .map(|err| err.formatted_message.as_ref().unwrap_or(&err.message).clone());
        if let Some(error) = error {
            return Err(CompileError::Compilation(error));
        }

        let file_name = contract_file_name(contract_name);
        let contract = output
            .contracts
            .get(&file_name)
            .and_then(|contracts| contracts.get(contract_name))
            .ok_or_else(|| CompileError::ContractMissing(contract_name.to_string()))?;

        let abi = contract
            .abi
            .as_ref()
            .map(|abi| abi.abi_value.clone())
            .unwrap_or_else(|| serde_json::Value::Array(vec![]));

        let bytecode = contract
            .evm
            .as_ref()
            .and_then(|evm| evm.bytecode.as_ref())
            .ok_or_else(|| CompileError::ContractMissing(contract_name.to_string()))?;
        let bytecode = match &bytecode.object {
            BytecodeObject::Bytecode(bytes) => normalize_bytecode(&hex::encode(bytes)),
            BytecodeObject::Unlinked(_) => {
                return Err(CompileError::UnlinkedBytecode(contract_name.to_string()))
            }
        };

        Ok(CompilationUnit {
            abi,
            bytecode,
            standard_json_input: input,
            sources,
        })
    }
}
