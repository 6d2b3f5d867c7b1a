// ============================================================================
// MODELS - MODULE PRINCIPAL
// ============================================================================
//
// Description:
//   Point d'entrée pour tous les modèles de données.
//   Chaque modèle correspond à une table PostgreSQL avec SeaORM.
//
// Liste des modules:
//   - accounts : Comptes utilisateurs (ADMIN, SELLER, BUYER)
//   - otps : Codes OTP à 4 chiffres (vérification email + reset password)
//   - revoked_tokens : Refresh tokens révoqués au logout (blacklist)
//   - carts : Panier (un seul par compte)
//   - cart_products : Liaison panier <-> produits
//   - categories : Catégories de produits
//   - products : Produits mis en vente par les sellers
//   - product_categories : Liaison produits <-> catégories
//   - product_images : Images supplémentaires d'un produit (max 3)
//   - product_reviews : Avis sur les produits (note 1-5 + modération)
//   - orders : Commandes créées au checkout
//   - order_products : Liaison commandes <-> produits
//   - transactions : Tentatives de paiement Paystack (pending/failed/...)
//
// Points d'attention:
//   - Tous les modèles utilisent SeaORM (pas de SQL brut)
//   - Les relations entre tables sont définies dans chaque modèle
//   - Les montants sont en Decimal (jamais de float pour l'argent)
//
// ============================================================================

pub mod accounts;
pub mod otps;
pub mod revoked_tokens;
pub mod carts;
pub mod cart_products;
pub mod categories;
pub mod products;
pub mod product_categories;
pub mod product_images;
pub mod product_reviews;
pub mod orders;
pub mod order_products;
pub mod transactions;
