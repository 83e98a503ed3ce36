use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::MatchError;
use crate::index::{EvidenceHit, JobHit, MatchIndex};
use crate::matching::similarity::similarity_from_distance;
use crate::models::evidence::{EvidenceTags, EvidenceUnit};
use crate::models::job::{JobPost, JobRequirement, RequirementType};
use crate::models::Embedding;

/// pgvector-backed index. Vectors travel as text literals (`[0.1,0.2]`) and
/// are cast with `::vector`; `<=>` is cosine distance.
#[derive(Clone)]
pub struct PgMatchIndex {
    pool: PgPool,
}

impl PgMatchIndex {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Formats a vector as a pgvector text literal.
pub fn to_pgvector(embedding: &[f32]) -> String {
    let parts: Vec<String> = embedding.iter().map(|x| x.to_string()).collect();
    format!("[{}]", parts.join(","))
}

/// Parses a pgvector text literal back into a vector.
pub fn parse_pgvector(raw: &str) -> Result<Embedding, MatchError> {
    let inner = raw
        .trim()
        .strip_prefix('[')
        .and_then(|s| s.strip_suffix(']'))
        .ok_or_else(|| MatchError::Validation(format!("not a vector literal: {raw}")))?;

    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|part| {
            part.trim()
                .parse::<f32>()
                .map_err(|_| MatchError::Validation(format!("bad vector component: {part}")))
        })
        .collect()
}

#[derive(Debug, FromRow)]
struct EvidenceRow {
    evidence_unit_id: String,
    source_text: String,
    source_section: Option<String>,
    tags: Option<Json<EvidenceTags>>,
    embedding: Option<String>,
    years_value: Option<f64>,
    years_context: Option<String>,
    is_total_years_claim: Option<bool>,
    distance: f64,
}

impl EvidenceRow {
    fn into_hit(self) -> Result<EvidenceHit, MatchError> {
        let embedding = self.embedding.as_deref().map(parse_pgvector).transpose()?;
        let similarity = similarity_from_distance(self.distance);
        Ok(EvidenceHit {
            evidence: EvidenceUnit {
                id: self.evidence_unit_id,
                text: self.source_text,
                source_section: self.source_section.unwrap_or_default(),
                tags: self.tags.map(|t| t.0).unwrap_or_default(),
                embedding,
                years_value: self.years_value,
                years_context: self.years_context,
                is_total_years_claim: self.is_total_years_claim.unwrap_or(false),
            },
            similarity,
        })
    }
}

#[derive(Debug, FromRow)]
struct JobRow {
    id: Uuid,
    title: String,
    company: String,
    location_text: Option<String>,
    is_remote: Option<bool>,
    company_num_employees: Option<String>,
    company_industry: Option<String>,
    job_level: Option<String>,
    distance: f64,
}

#[derive(Debug, FromRow)]
struct RequirementRow {
    id: String,
    job_post_id: Uuid,
    req_type: String,
    text: String,
    embedding: Option<String>,
    min_years: Option<f64>,
    years_context: Option<String>,
}

impl RequirementRow {
    fn into_requirement(self) -> Result<Option<JobRequirement>, MatchError> {
        let Some(req_type) = RequirementType::parse(&self.req_type) else {
            warn!("Skipping requirement {} with unknown type '{}'", self.id, self.req_type);
            return Ok(None);
        };
        Ok(Some(JobRequirement {
            id: self.id,
            req_type,
            text: self.text,
            embedding: self.embedding.as_deref().map(parse_pgvector).transpose()?,
            min_years: self.min_years,
            years_context: self.years_context,
        }))
    }
}

#[async_trait]
impl MatchIndex for PgMatchIndex {
    async fn find_best_evidence_for_requirement(
        &self,
        requirement_embedding: &[f32],
        resume_fingerprint: &str,
        top_k: usize,
    ) -> Result<Vec<EvidenceHit>, MatchError> {
        let rows = sqlx::query_as::<_, EvidenceRow>(
            r#"
            SELECT evidence_unit_id, source_text, source_section, tags,
                   embedding::text AS embedding,
                   years_value, years_context, is_total_years_claim,
                   (embedding <=> $1::vector)::float8 AS distance
            FROM resume_evidence_unit_embeddings
            WHERE resume_fingerprint = $2 AND embedding IS NOT NULL
            ORDER BY embedding <=> $1::vector
            LIMIT $3
            "#,
        )
        .bind(to_pgvector(requirement_embedding))
        .bind(resume_fingerprint)
        .bind(top_k as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(EvidenceRow::into_hit).collect()
    }

    async fn get_top_jobs_by_summary_embedding(
        &self,
        resume_embedding: &[f32],
        limit: usize,
        tenant_id: Option<Uuid>,
    ) -> Result<Vec<JobHit>, MatchError> {
        let rows = sqlx::query_as::<_, JobRow>(
            r#"
            SELECT id, title, company, location_text, is_remote,
                   company_num_employees, company_industry, job_level,
                   (summary_embedding <=> $1::vector)::float8 AS distance
            FROM job_post
            WHERE is_embedded = TRUE
              AND summary_embedding IS NOT NULL
              AND ($2::uuid IS NULL OR tenant_id = $2)
            ORDER BY summary_embedding <=> $1::vector
            LIMIT $3
            "#,
        )
        .bind(to_pgvector(resume_embedding))
        .bind(tenant_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(Vec::new());
        }

        let job_ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let requirement_rows = sqlx::query_as::<_, RequirementRow>(
            r#"
            SELECT id::text AS id, job_post_id, req_type, text,
                   embedding::text AS embedding, min_years, years_context
            FROM job_requirement_unit
            WHERE job_post_id = ANY($1)
            ORDER BY job_post_id, ordinal
            "#,
        )
        .bind(&job_ids)
        .fetch_all(&self.pool)
        .await?;

        let mut requirements: HashMap<Uuid, Vec<JobRequirement>> = HashMap::new();
        for row in requirement_rows {
            let job_id = row.job_post_id;
            if let Some(requirement) = row.into_requirement()? {
                requirements.entry(job_id).or_default().push(requirement);
            }
        }

        debug!("Stage-1 lookup returned {} jobs", rows.len());

        Ok(rows
            .into_iter()
            .map(|row| JobHit {
                similarity: similarity_from_distance(row.distance),
                job: JobPost {
                    requirements: requirements.remove(&row.id).unwrap_or_default(),
                    id: row.id,
                    title: row.title,
                    company: row.company,
                    location_text: row.location_text,
                    is_remote: row.is_remote.unwrap_or(false),
                    company_num_employees: row.company_num_employees,
                    company_industry: row.company_industry,
                    job_level: row.job_level,
                },
            })
            .collect())
    }

    async fn get_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
    ) -> Result<Option<Embedding>, MatchError> {
        let raw: Option<String> = sqlx::query_scalar(
            "SELECT embedding::text FROM resume_summary_embeddings WHERE resume_fingerprint = $1",
        )
        .bind(resume_fingerprint)
        .fetch_optional(&self.pool)
        .await?;

        raw.as_deref().map(parse_pgvector).transpose()
    }

    async fn save_evidence_units(
        &self,
        resume_fingerprint: &str,
        units: &[EvidenceUnit],
    ) -> Result<(), MatchError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM resume_evidence_unit_embeddings WHERE resume_fingerprint = $1")
            .bind(resume_fingerprint)
            .execute(&mut *tx)
            .await?;

        for unit in units {
            sqlx::query(
                r#"
                INSERT INTO resume_evidence_unit_embeddings
                    (resume_fingerprint, evidence_unit_id, source_text, source_section, tags,
                     embedding, years_value, years_context, is_total_years_claim)
                VALUES ($1, $2, $3, $4, $5, $6::vector, $7, $8, $9)
                "#,
            )
            .bind(resume_fingerprint)
            .bind(&unit.id)
            .bind(&unit.text)
            .bind(&unit.source_section)
            .bind(Json(&unit.tags))
            .bind(unit.embedding.as_deref().map(to_pgvector))
            .bind(unit.years_value)
            .bind(&unit.years_context)
            .bind(unit.is_total_years_claim)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        info!(
            "Stored {} evidence units for resume {}",
            units.len(),
            resume_fingerprint
        );
        Ok(())
    }

    async fn save_resume_summary_embedding(
        &self,
        resume_fingerprint: &str,
        embedding: &[f32],
        details: &Value,
    ) -> Result<(), MatchError> {
        sqlx::query(
            r#"
            INSERT INTO resume_summary_embeddings (resume_fingerprint, embedding, details, updated_at)
            VALUES ($1, $2::vector, $3, NOW())
            ON CONFLICT (resume_fingerprint)
            DO UPDATE SET embedding = EXCLUDED.embedding,
                          details = EXCLUDED.details,
                          updated_at = NOW()
            "#,
        )
        .bind(resume_fingerprint)
        .bind(to_pgvector(embedding))
        .bind(Json(details))
        .execute(&self.pool)
        .await?;

        debug!("Stored Stage-1 embedding for resume {}", resume_fingerprint);
        Ok(())
    }
}
