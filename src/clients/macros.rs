/// Generates authoritative reads for a client holding a `ResourceClient`.
///
/// `find_<name>` returns `None` for a missing document, `require_<name>` turns
/// that into [`StorefrontError::NotFound`](crate::error::StorefrontError::NotFound).
/// Neither consults the read cache.
macro_rules! impl_store_reads {
    ($client_name:ident, $field:ident, $entity:ty, $id:ty, $entity_name_snake:ident) => {
        paste::paste! {
            impl $client_name {
                #[tracing::instrument(skip(self))]
                pub async fn [<find_ $entity_name_snake>](
                    &self,
                    id: $id,
                ) -> $crate::error::StorefrontResult<Option<$entity>> {
                    tracing::debug!("Sending request");
                    Ok(self.$field.get(id).await?)
                }

                #[tracing::instrument(skip(self))]
                pub async fn [<require_ $entity_name_snake>](
                    &self,
                    id: $id,
                ) -> $crate::error::StorefrontResult<$entity> {
                    let missing = format!("{} {}", stringify!($entity_name_snake), id);
                    self.[<find_ $entity_name_snake>](id)
                        .await?
                        .ok_or_else(|| $crate::error::StorefrontError::not_found(missing))
                }
            }
        }
    };
}
