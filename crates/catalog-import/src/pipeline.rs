//! Pipeline kinds and their column contracts.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;
use crate::reader::Header;

/// The five import flows. Each kind fixes a column contract, a row mapper,
/// a reconciliation strategy, and an apply action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineKind {
    /// Backfill `descripcion_detallada` by id or name.
    Description,
    /// Price update from the downloadable template.
    Prices,
    /// Image URLs written into slots 1..5.
    ImageUrls,
    /// Full product import: updates by id/name, creates unmatched names.
    Products,
    /// Image files named `CODE_N.ext`.
    ImageFiles,
}

/// Which columns a spreadsheet must, may, and must not carry.
#[derive(Debug, Clone, Copy)]
pub struct ColumnContract {
    pub required: &'static [&'static str],
    /// At least one of these must be present.
    pub one_of: &'static [&'static str],
    pub optional: &'static [&'static str],
    /// Closed contracts reject any column not listed above.
    pub closed: bool,
}

impl ColumnContract {
    fn allows(&self, key: &str) -> bool {
        self.required
            .iter()
            .chain(self.one_of)
            .chain(self.optional)
            .any(|k| *k == key)
    }
}

const DESCRIPTION_CONTRACT: ColumnContract = ColumnContract {
    required: &[],
    one_of: &["id", "descripcion"],
    optional: &["descripcion_detallada"],
    closed: false,
};

const PRICES_CONTRACT: ColumnContract = ColumnContract {
    required: &["descripcion", "precio"],
    one_of: &[],
    optional: &["categoria", "marca", "destacado", "descripcion_detallada"],
    closed: true,
};

const IMAGE_URLS_CONTRACT: ColumnContract = ColumnContract {
    required: &["id", "descripcion"],
    one_of: &[],
    optional: &["imagen", "imagen_2", "imagen_3", "imagen_4", "imagen_5"],
    closed: false,
};

const PRODUCTS_CONTRACT: ColumnContract = ColumnContract {
    required: &["descripcion", "precio"],
    one_of: &[],
    optional: &["id", "aplica_todos_plan", "fk_id_categoria", "fk_id_marca"],
    closed: true,
};

impl PipelineKind {
    pub const ALL: [Self; 5] = [
        Self::Description,
        Self::Prices,
        Self::ImageUrls,
        Self::Products,
        Self::ImageFiles,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Prices => "prices",
            Self::ImageUrls => "image-urls",
            Self::Products => "products",
            Self::ImageFiles => "image-files",
        }
    }

    /// `true` for the pipeline that takes image files instead of a sheet.
    #[must_use]
    pub fn takes_files(self) -> bool {
        matches!(self, Self::ImageFiles)
    }

    /// Column contract for spreadsheet pipelines; `None` for image files.
    #[must_use]
    pub fn contract(self) -> Option<&'static ColumnContract> {
        match self {
            Self::Description => Some(&DESCRIPTION_CONTRACT),
            Self::Prices => Some(&PRICES_CONTRACT),
            Self::ImageUrls => Some(&IMAGE_URLS_CONTRACT),
            Self::Products => Some(&PRODUCTS_CONTRACT),
            Self::ImageFiles => None,
        }
    }

    /// Validates a header row against this kind's column contract.
    ///
    /// # Errors
    ///
    /// - [`SchemaError::MissingRequiredColumn`] for the first absent required
    ///   column, or when no member of a one-of group is present.
    /// - [`SchemaError::ForbiddenColumn`] listing every extra column (as
    ///   spelled in the file) for closed contracts.
    pub fn check_schema(self, headers: &[Header]) -> Result<(), SchemaError> {
        let Some(contract) = self.contract() else {
            return Ok(());
        };
        let has = |key: &str| headers.iter().any(|h| h.key == key);

        if let Some(missing) = contract.required.iter().find(|k| !has(**k)) {
            return Err(SchemaError::MissingRequiredColumn((*missing).to_string()));
        }
        if !contract.one_of.is_empty() && !contract.one_of.iter().any(|k| has(*k)) {
            return Err(SchemaError::MissingRequiredColumn(
                contract.one_of.join(" or "),
            ));
        }

        if contract.closed {
            let extra: Vec<String> = headers
                .iter()
                .filter(|h| !contract.allows(&h.key))
                .map(|h| h.raw.clone())
                .collect();
            if !extra.is_empty() {
                return Err(SchemaError::ForbiddenColumn(extra));
            }
        }

        Ok(())
    }
}

impl fmt::Display for PipelineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for PipelineKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Self::ALL.iter().map(|k| k.name()).collect();
                format!(
                    "unknown import kind '{s}'; expected one of: {}",
                    names.join(", ")
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::headers::canonical_header;

    fn headers(raw: &[&str]) -> Vec<Header> {
        raw.iter()
            .map(|r| Header {
                raw: (*r).to_string(),
                key: canonical_header(r),
            })
            .collect()
    }

    #[test]
    fn kind_names_round_trip_through_from_str() {
        for kind in PipelineKind::ALL {
            assert_eq!(kind.name().parse::<PipelineKind>(), Ok(kind));
        }
        assert_eq!("IMAGE_URLS".parse::<PipelineKind>(), Ok(PipelineKind::ImageUrls));
    }

    #[test]
    fn unknown_kind_lists_choices() {
        let err = "stock".parse::<PipelineKind>().unwrap_err();
        assert!(err.contains("unknown import kind 'stock'"));
        assert!(err.contains("image-files"));
    }

    #[test]
    fn prices_accepts_template_headers() {
        let h = headers(&[
            "Descripción",
            "Precio",
            "Categoría",
            "Marca",
            "Destacado",
            "Descripción Detallada",
        ]);
        assert_eq!(PipelineKind::Prices.check_schema(&h), Ok(()));
    }

    #[test]
    fn prices_rejects_extra_columns_with_original_spelling() {
        let h = headers(&["Descripción", "Precio", "Stock", "Color"]);
        assert_eq!(
            PipelineKind::Prices.check_schema(&h),
            Err(SchemaError::ForbiddenColumn(vec![
                "Stock".to_string(),
                "Color".to_string()
            ]))
        );
    }

    #[test]
    fn prices_missing_price_column() {
        let h = headers(&["Descripción"]);
        assert_eq!(
            PipelineKind::Prices.check_schema(&h),
            Err(SchemaError::MissingRequiredColumn("precio".to_string()))
        );
    }

    #[test]
    fn description_needs_id_or_name() {
        assert_eq!(
            PipelineKind::Description.check_schema(&headers(&["id", "descripcion_detallada"])),
            Ok(())
        );
        assert_eq!(
            PipelineKind::Description.check_schema(&headers(&["descripcion_detallada"])),
            Err(SchemaError::MissingRequiredColumn(
                "id or descripcion".to_string()
            ))
        );
    }

    #[test]
    fn open_contracts_ignore_unknown_columns() {
        let h = headers(&["ID", "Descripción", "imagen", "notas"]);
        assert_eq!(PipelineKind::ImageUrls.check_schema(&h), Ok(()));
    }

    #[test]
    fn products_is_closed() {
        let h = headers(&["descripcion", "precio", "fk_id_marca", "stock"]);
        assert_eq!(
            PipelineKind::Products.check_schema(&h),
            Err(SchemaError::ForbiddenColumn(vec!["stock".to_string()]))
        );
    }

    #[test]
    fn image_files_has_no_contract() {
        assert!(PipelineKind::ImageFiles.contract().is_none());
        assert!(PipelineKind::ImageFiles.takes_files());
        assert_eq!(PipelineKind::ImageFiles.check_schema(&[]), Ok(()));
    }
}
