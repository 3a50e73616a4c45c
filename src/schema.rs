//! Column-name constants for the stock-transfer tables.
//! Source column names follow the ERP tables the records are read from.

// ── Movement header columns (romaneios_dbf) ─────────────────────────────────
pub mod header {
    pub const TABLE: &str = "romaneios_dbf";

    pub const STORE: &str = "LOJA";
    pub const MOVEMENT_ID: &str = "ROMANEIO";
    pub const REGISTRATION_DATE: &str = "CADASTRO";
    pub const DESTINATION_STORE: &str = "CADASTRO_CODIGO";
    pub const STATUS: &str = "SITUACAO";

    // Eligibility columns: only plain store-to-store transfers qualify.
    pub const OPERATION_CODE: &str = "OPERACAO_CODIGO";
    pub const PURCHASE_ORDER_STORE: &str = "COMPRA_PEDIDO_LOJA";
    pub const PURCHASE_ORDER_CODE: &str = "COMPRA_PEDIDO_CODIGO";
    pub const ORIGIN_TYPE: &str = "ORIGEM_TIPO";

    pub const TRANSFER_OPERATION: i64 = 4;

    pub const REQUIRED: [&str; 5] = [
        STORE,
        MOVEMENT_ID,
        REGISTRATION_DATE,
        DESTINATION_STORE,
        STATUS,
    ];
}

// ── Movement line columns (romaneios_itens_dbf) ─────────────────────────────
pub mod line {
    pub const TABLE: &str = "romaneios_itens_dbf";

    pub const REGISTRATION_DATE: &str = "CADASTRO";
    pub const STORE: &str = "LOJA";
    pub const ITEM_CODE: &str = "CODIGO_X";
    pub const ITEM_SUBCODE: &str = "CODIGO_SEQUENCIA";
    pub const QUANTITY: &str = "QUANTIDADE";
    pub const MOVEMENT_ID: &str = "ROMANEIO";
    pub const DESCRIPTION: &str = "DESCRICAO";

    pub const REQUIRED: [&str; 7] = [
        REGISTRATION_DATE,
        STORE,
        ITEM_CODE,
        ITEM_SUBCODE,
        QUANTITY,
        MOVEMENT_ID,
        DESCRIPTION,
    ];

    /// Grouping key used to pre-aggregate line quantities.
    pub const AGGREGATION_KEY: [&str; 6] = [
        REGISTRATION_DATE,
        STORE,
        ITEM_CODE,
        ITEM_SUBCODE,
        MOVEMENT_ID,
        DESCRIPTION,
    ];
}

// ── Joined transfer columns ─────────────────────────────────────────────────
pub mod transfer {
    pub const ORIGIN_STORE: &str = "LOJA_ORIGEM";
    pub const DESTINATION_STORE: &str = "LOJA_DESTINO";
    pub const ITEM_CODE: &str = "CODIGO_X";
    pub const ITEM_SUBCODE: &str = "CODIGO_SEQUENCIA";
    pub const QUANTITY: &str = "QUANTIDADE";
    pub const DESCRIPTION: &str = "DESCRICAO";
    pub const DESTINATION_DATE: &str = "DATA_DESTINO";
    pub const ORIGIN_DATE: &str = "DATA_ORIGEM";

    pub const ALL: [&str; 7] = [
        ORIGIN_STORE,
        DESTINATION_STORE,
        ITEM_CODE,
        ITEM_SUBCODE,
        QUANTITY,
        DESCRIPTION,
        DESTINATION_DATE,
    ];
}

// ── Display names (table header and CSV export) ─────────────────────────────
pub mod display {
    pub const ORIGIN_STORE: &str = "Loja Origem";
    pub const DESTINATION_STORE: &str = "Loja Destino";
    pub const ITEM_CODE: &str = "Código X";
    pub const ITEM_SUBCODE: &str = "Código Seq.";
    pub const QUANTITY: &str = "Total Qtd";
    pub const DESCRIPTION: &str = "Descrição";
    pub const DESTINATION_DATE: &str = "Data Destino";
}

// ── Status codes ────────────────────────────────────────────────────────────
pub mod status {
    pub const CLOSED: &str = "FECHADO";
    pub const OPEN: &str = "EM_ABERTO";
}
